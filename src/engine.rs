//! The pass loop: the fixed point that discovers the transitive symbol and
//! library closure and drives reduction (spec §4.4).

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use fs_err as fs;
use log::info;
use log::trace;

use crate::classifier::WorkingSet;
use crate::inspector::ElfInspector;
use crate::locator::LibraryLocator;
use crate::provider::merge_present_symbols;
use crate::provider::ProviderMap;
use crate::reducer::link_library_args;
use crate::reducer::reduce;
use crate::reducer::Linker;
use crate::reducer::ObjCopy;
use crate::reducer::ReduceContext;
use crate::reducer::ReduceOutcome;
use crate::symbol::Symbol;
use crate::Error;

/// Configuration the closure engine needs beyond the collaborators
/// ([`ElfInspector`], [`Linker`], [`ObjCopy`], [`LibraryLocator`]).
pub struct EngineOptions {
    /// Destination directory reduced libraries are written into.
    pub dest_dir: PathBuf,
    /// Filesystem root libraries already inside are left untouched.
    pub root: Option<PathBuf>,
    /// Directory holding `soinit.o`/`sofini.o` for libc relinks.
    pub libc_extras_dir: PathBuf,
    /// Libraries force-included even without an undefined-symbol demand.
    pub force_libs: Vec<String>,
    /// The dynamic loader, already resolved (spec §4.3 loader selection).
    pub ldlib: PathBuf,
}

/// Summary of a completed run, useful for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineReport {
    /// Number of passes executed before the closure terminated.
    pub passes: u32,
}

/// Run the pass loop to a fixed point.
///
/// `working_set` seeds the first pass (the classifier's non-library,
/// non-script inputs); `locator` is mutated only by callers before this is
/// invoked (rpath augmentation happens in the caller, per spec §4.2).
pub fn run(
    mut working_set: WorkingSet,
    options: &EngineOptions,
    locator: &LibraryLocator,
    inspector: &dyn ElfInspector,
    linker: &dyn Linker,
    objcopy: &dyn ObjCopy,
) -> Result<EngineReport, Error> {
    let mut available_libraries: Vec<PathBuf> = Vec::new();
    let mut previous_unresolved: Option<HashSet<String>> = None;
    let mut pass: u32 = 1;

    loop {
        info!("library reduction pass {pass}");

        // Step A: ingest already-reduced libraries from the destination.
        let reduced_libs = ingest_reduced_libraries(&options.dest_dir, &mut working_set)?;

        // Step B: compute demand.
        let mut needed_symbols = HashMap::new();
        let mut needed_libraries: BTreeSet<String> = options.force_libs.iter().cloned().collect();
        for path in working_set.paths() {
            for symbol in inspector.undefined(path)? {
                needed_symbols.insert(symbol.key(), symbol);
            }
            for library in inspector.needed(path)? {
                needed_libraries.insert(library);
            }
        }

        // Step C: compute supply.
        let mut supplying: Vec<Vec<Symbol>> = Vec::new();
        for path in reduced_libs.iter().chain(available_libraries.iter()).chain([&options.ldlib]) {
            supplying.push(inspector.defined(path)?);
        }
        let present_symbols =
            merge_present_symbols(supplying.iter().map(Vec::as_slice));

        // Step D: termination test.
        let unresolved: HashSet<String> = needed_symbols
            .keys()
            .filter(|key| !present_symbols.contains_key(*key))
            .cloned()
            .collect();
        trace!(
            "{} symbols, {} unresolved",
            needed_symbols.len(),
            unresolved.len()
        );
        if unresolved.is_empty() {
            return Ok(EngineReport { passes: pass });
        }
        if previous_unresolved.as_ref() == Some(&unresolved) {
            for key in &unresolved {
                if let Some(symbol) = needed_symbols.get(key) {
                    if !symbol.weak {
                        return Err(Error::UnresolvableSymbol(key.clone()));
                    }
                }
            }
            return Ok(EngineReport { passes: pass });
        }
        previous_unresolved = Some(unresolved);

        // Step E: old-ABI ARM workaround.
        if let Some(first) = needed_libraries.iter().next().cloned() {
            if let Some(path) = locator.find(&first) {
                if inspector.header(&path)?.is_old_abi_arm() {
                    needed_libraries.insert("libgcc_s.so.1".to_string());
                }
            }
        }

        // Step F: provider selection.
        let mut library_paths = HashMap::new();
        let mut library_symbols = HashMap::new();
        for library in &needed_libraries {
            let path = locator.find(library).ok_or_else(|| Error::LibraryNotFound {
                library: library.clone(),
                searched: locator.display_path(),
            })?;
            let symbols = inspector.defined(&path)?;
            library_paths.insert(library.clone(), path);
            library_symbols.insert(library.clone(), symbols);
        }
        let provider_map = ProviderMap::build(
            needed_libraries
                .iter()
                .map(|library| (library.as_str(), library_symbols[library].as_slice())),
        );

        // Step G: per-library used-symbol sets.
        let mut library_symbols_used: HashMap<String, Vec<Symbol>> = HashMap::new();
        for (key, undefined) in &needed_symbols {
            match provider_map.get(key) {
                Some((library, symbol)) => library_symbols_used
                    .entry(library.to_string())
                    .or_default()
                    .push(symbol.clone()),
                None if undefined.weak => {}
                None => return Err(Error::UnresolvableSymbol(key.clone())),
            }
        }

        // Step H: reduction.
        let mut search_dirs = vec![options.dest_dir.clone()];
        search_dirs.extend(locator.search_path().iter().cloned());
        for library in &needed_libraries {
            let path = &library_paths[library];
            let pic_archive = locator.find_pic(library);
            let pic_map = locator.find_pic_map(library);
            let soname = inspector.soname(path)?;
            let original_needed = inspector.needed(path)?;
            let link_libs = link_library_args(&original_needed, &options.ldlib);
            let empty = Vec::new();
            let symbols_used = library_symbols_used.get(library).unwrap_or(&empty);
            let ctx = ReduceContext {
                dest_dir: &options.dest_dir,
                root: options.root.as_deref(),
                libc_extras_dir: &options.libc_extras_dir,
                search_dirs: &search_dirs,
            };
            let outcome = reduce(
                library,
                path,
                pic_archive.as_deref(),
                pic_map.as_deref(),
                soname.as_deref(),
                &link_libs,
                symbols_used,
                &ctx,
                linker,
                objcopy,
            )?;
            if outcome == ReduceOutcome::AlreadyInRoot && !available_libraries.contains(path) {
                available_libraries.push(path.clone());
            }
        }

        pass += 1;
    }
}

fn ingest_reduced_libraries(
    dest_dir: &Path,
    working_set: &mut WorkingSet,
) -> Result<Vec<PathBuf>, Error> {
    let mut reduced = Vec::new();
    if !dest_dir.exists() {
        return Ok(reduced);
    }
    for entry in fs::read_dir(dest_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with("-so-stripped") {
            let path = entry.path();
            working_set.insert_path(path.clone())?;
            reduced.push(path);
        }
    }
    Ok(reduced)
}
