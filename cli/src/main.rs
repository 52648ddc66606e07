use std::env::split_paths;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Parser;

use libslim::classify;
use libslim::finalize;
use libslim::gather_rpaths;
use libslim::run_engine;
use libslim::ElfInspector;
use libslim::EngineOptions;
use libslim::Error;
use libslim::LibraryLocator;
use libslim::WorkingSet;
use libslim_exec::ExternalElfInspector;
use libslim_exec::ExternalLinker;
use libslim_exec::ExternalObjCopy;

mod logger;

use self::logger::Logger;

/// Build a minimal shared-library directory for a set of executables.
#[derive(Parser)]
#[clap(version)]
struct Args {
    /// Input executables; libraries and the dynamic loader they need are
    /// discovered transitively.
    #[clap(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Destination directory the reduced libraries are written into.
    #[clap(short = 'd', long = "dest-dir", value_name = "DIR")]
    dest_dir: PathBuf,

    /// Prepend DIR(s) to the library search path; repeatable, colon-joined.
    #[clap(short = 'L', value_name = "DIR[:DIR...]", action = ArgAction::Append)]
    search_dirs: Vec<String>,

    /// Suppress the default library search path.
    #[clap(short = 'D', long = "no-default-lib")]
    no_default_lib: bool,

    /// Force-include this library even without an undefined-symbol demand;
    /// repeatable.
    #[clap(short = 'l', value_name = "LIB", action = ArgAction::Append)]
    force_libs: Vec<String>,

    /// Dynamic loader path; overrides auto-detection and the `ldlib`
    /// environment variable.
    #[clap(long = "ldlib", value_name = "PATH")]
    ldlib: Option<PathBuf>,

    /// Directory holding `soinit.o`/`sofini.o` for libc re-linking.
    #[clap(long = "libc-extras-dir", value_name = "DIR", default_value = "/usr/lib/libc_pic")]
    libc_extras_dir: PathBuf,

    /// Prefix prepended to linker and object-copy invocations (cross-toolchain
    /// support).
    #[clap(long = "target", value_name = "PREFIX")]
    target: Option<String>,

    /// Filesystem root rpaths are interpreted under, and inside which
    /// libraries are left untouched.
    #[clap(long = "root", value_name = "PATH")]
    root: Option<PathBuf>,

    /// Increase verbosity; repeatable up to two levels.
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    match do_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn do_main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    Logger::init(args.verbose)?;

    let inspector = ExternalElfInspector::new(args.root.clone());
    let linker = ExternalLinker::new(args.target.clone());
    let objcopy = ExternalObjCopy::new(args.target.clone());

    let classified = classify(&args.files)?;
    let rpaths = gather_rpaths(&classified.working_set, args.root.as_deref(), &inspector)?;

    let mut search_path: Vec<PathBuf> = Vec::new();
    for entry in &args.search_dirs {
        search_path.extend(split_paths(entry));
    }
    if !args.no_default_lib {
        search_path.extend(LibraryLocator::default_search_path());
    }
    search_path.extend(rpaths);
    let locator = LibraryLocator::new(search_path);

    let ldlib = resolve_ldlib(&args, &classified.working_set, &inspector)?;

    let options = EngineOptions {
        dest_dir: args.dest_dir.clone(),
        root: args.root.clone(),
        libc_extras_dir: args.libc_extras_dir.clone(),
        force_libs: args.force_libs.clone(),
        ldlib: ldlib.clone(),
    };

    let report = run_engine(
        classified.working_set,
        &options,
        &locator,
        &inspector,
        &linker,
        &objcopy,
    )?;
    log::info!("closure reached after {} pass(es)", report.passes);

    finalize(&args.dest_dir, &ldlib, &inspector, &objcopy)?;
    Ok(())
}

/// `--ldlib`, then the `ldlib` environment variable, then the first
/// `PT_INTERP` found among the input objects.
fn resolve_ldlib(
    args: &Args,
    working_set: &WorkingSet,
    inspector: &ExternalElfInspector,
) -> Result<PathBuf, Error> {
    if let Some(ldlib) = &args.ldlib {
        return Ok(ldlib.clone());
    }
    if let Ok(ldlib) = std::env::var("ldlib") {
        if !ldlib.is_empty() {
            return Ok(PathBuf::from(ldlib));
        }
    }
    for path in working_set.paths() {
        if let Some(interp) = inspector.interp(path)? {
            return Ok(interp);
        }
    }
    Err(Error::LoaderNotFound)
}
