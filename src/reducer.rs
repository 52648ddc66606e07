//! Per-library relinking/stripping (spec §4.6).
//!
//! The actual sub-process invocations are abstracted behind the [`Linker`]
//! and [`ObjCopy`] traits so the reduction logic can be unit-tested without
//! a real toolchain; `libslim-exec` provides the sub-process-backed
//! implementations used in production.

use std::path::Path;
use std::path::PathBuf;

use log::debug;
use log::trace;
use log::warn;

use crate::symbol::Symbol;
use crate::Error;

/// The C runtime's `SONAME`s that trigger the `soinit.o`/`sofini.o` dance.
pub const LIBC_SONAMES: &[&str] = &["libc.so.6", "libc.so.6.1"];

/// Everything the reducer needs to relink one library from its PIC archive.
pub struct LinkRequest<'a> {
    /// Where to write the unstripped shared object.
    pub output: &'a Path,
    /// `-Wl,-soname=` value; the library's own declared `SONAME`.
    pub soname: &'a str,
    /// PIC archive to link (replaces the usual set of `.o` files).
    pub pic_archive: &'a Path,
    /// `soinit.o`-style objects linked before the archive.
    pub pre_objects: &'a [PathBuf],
    /// `sofini.o`-style objects linked after the archive.
    pub post_objects: &'a [PathBuf],
    /// Optional linker version script (`--version-script=`).
    pub version_script: Option<&'a Path>,
    /// Symbols to force-include via `-u<name>`.
    pub force_include: &'a [String],
    /// `-l`-style library names and absolute paths (for the loader), in the
    /// order the original object's `DT_NEEDED` listed them.
    pub link_libs: &'a [String],
    /// Search directories, with the destination directory already first.
    pub search_dirs: &'a [PathBuf],
}

/// Wraps the external linker/compiler invocation.
pub trait Linker {
    /// Relink a shared object per `request`, producing `-shared -nostdlib
    /// -nostartfiles` output at `request.output`.
    fn link(&self, request: &LinkRequest) -> Result<(), Error>;
}

/// Wraps the external object-copy (strip) invocation.
pub trait ObjCopy {
    /// `--strip-unneeded -R .note -R .comment input -o output`.
    fn strip(&self, input: &Path, output: &Path) -> Result<(), Error>;
}

/// Outcome of attempting to reduce a single library in a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceOutcome {
    /// The library already lives inside the configured root; left untouched
    /// and recorded as available.
    AlreadyInRoot,
    /// Relinked from a PIC archive; the stripped artifact is ready to be
    /// picked up as a `WorkingSet` object on the next pass.
    Relinked,
    /// No PIC archive was available; the original was stripped verbatim.
    CopiedWithoutReduction,
    /// The library had no `DT_SONAME`; reduction was skipped (spec:
    /// `MissingSoname`, non-fatal).
    MissingSoname,
}

/// Staged artifact basenames for a library, per the `-so`/`-so-stripped`
/// naming convention (spec §4.6).
pub fn staging_names(basename: &str) -> (String, String) {
    (format!("{basename}-so"), format!("{basename}-so-stripped"))
}

/// Translate a library's `DT_NEEDED` basenames into link-time arguments:
/// `libFOO.so*` becomes `-lFOO`; the configured dynamic loader is passed as
/// its absolute path; anything else is dropped (spec §4.6 step 3).
pub fn link_library_args(needed: &[String], ldlib: &Path) -> Vec<String> {
    let ldlib_basename = ldlib.file_name().map(|n| n.to_string_lossy().into_owned());
    needed
        .iter()
        .filter_map(|name| {
            if Some(name.as_str()) == ldlib_basename.as_deref() {
                return Some(ldlib.display().to_string());
            }
            let rest = name.strip_prefix("lib")?;
            let libname = rest.split(".so").next()?;
            if libname.is_empty() {
                None
            } else {
                Some(format!("-l{libname}"))
            }
        })
        .collect()
}


/// Parameters controlling how a library is reduced, factored out of
/// [`reduce`]'s argument list.
pub struct ReduceContext<'a> {
    /// Destination directory artifacts are written into.
    pub dest_dir: &'a Path,
    /// Filesystem root libraries already inside are left untouched.
    pub root: Option<&'a Path>,
    /// Directory holding `soinit.o`/`sofini.o` for libc relinks.
    pub libc_extras_dir: &'a Path,
    /// Search directories passed to the linker, destination-dir-first.
    pub search_dirs: &'a [PathBuf],
}

/// Reduce one library: locate its PIC archive (if any), relink or
/// copy-and-strip, and report what happened.
#[allow(clippy::too_many_arguments)]
pub fn reduce(
    library: &str,
    path: &Path,
    pic_archive: Option<&Path>,
    pic_map: Option<&Path>,
    soname: Option<&str>,
    link_libs: &[String],
    symbols_used: &[Symbol],
    ctx: &ReduceContext,
    linker: &dyn Linker,
    objcopy: &dyn ObjCopy,
) -> Result<ReduceOutcome, Error> {
    if let Some(root) = ctx.root {
        if path.starts_with(root) {
            debug!("no action required for {path:?}, already inside {root:?}");
            return Ok(ReduceOutcome::AlreadyInRoot);
        }
    }
    let (unstripped_name, stripped_name) = staging_names(library);
    let Some(pic_archive) = pic_archive else {
        debug!("no PIC archive found for {path:?}; copying");
        objcopy.strip(path, &ctx.dest_dir.join(&stripped_name))?;
        return Ok(ReduceOutcome::CopiedWithoutReduction);
    };
    let Some(soname) = soname else {
        warn!("{path:?} has no SONAME, cannot safely rename; skipping reduction");
        return Ok(ReduceOutcome::MissingSoname);
    };
    trace!("extracting from {pic_archive:?}, so_file: {path:?}, soname: {soname}");

    let mut force_include: Vec<String> = symbols_used.iter().map(Symbol::linker_reference).collect();
    let mut pre_objects = Vec::new();
    let mut post_objects = Vec::new();
    if LIBC_SONAMES.contains(&soname) {
        pre_objects.push(ctx.libc_extras_dir.join("soinit.o"));
        post_objects.push(ctx.libc_extras_dir.join("sofini.o"));
        force_include.push(Symbol::dso_handle().linker_reference());
    }
    force_include.sort();
    force_include.dedup();

    let unstripped_path = ctx.dest_dir.join(&unstripped_name);
    let request = LinkRequest {
        output: &unstripped_path,
        soname,
        pic_archive,
        pre_objects: &pre_objects,
        post_objects: &post_objects,
        version_script: pic_map,
        force_include: &force_include,
        link_libs,
        search_dirs: ctx.search_dirs,
    };
    linker.link(&request)?;
    objcopy.strip(&unstripped_path, &ctx.dest_dir.join(&stripped_name))?;
    Ok(ReduceOutcome::Relinked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeLinker {
        requests: RefCell<Vec<String>>,
    }

    impl Linker for FakeLinker {
        fn link(&self, request: &LinkRequest) -> Result<(), Error> {
            self.requests.borrow_mut().push(request.soname.to_string());
            std::fs::write(request.output, b"linked").map_err(Error::from)
        }
    }

    #[derive(Default)]
    struct FakeObjCopy;

    impl ObjCopy for FakeObjCopy {
        fn strip(&self, input: &Path, output: &Path) -> Result<(), Error> {
            std::fs::copy(input, output)?;
            Ok(())
        }
    }

    #[test]
    fn falls_back_to_copy_when_no_pic_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = dir.path().join("libquirk.so.1");
        std::fs::write(&original, b"original bytes").expect("write");
        let ctx = ReduceContext {
            dest_dir: dir.path(),
            root: None,
            libc_extras_dir: Path::new("/usr/lib/libc_pic"),
            search_dirs: &[],
        };
        let outcome = reduce(
            "libquirk.so.1",
            &original,
            None,
            None,
            Some("libquirk.so.1"),
            &[],
            &[],
            &ctx,
            &FakeLinker::default(),
            &FakeObjCopy,
        )
        .expect("reduce");
        assert_eq!(outcome, ReduceOutcome::CopiedWithoutReduction);
        assert!(dir.path().join("libquirk.so.1-so-stripped").exists());
    }

    #[test]
    fn libc_relink_adds_extras_and_dso_handle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("libc_pic.a");
        std::fs::write(&archive, b"archive").expect("write");
        let ctx = ReduceContext {
            dest_dir: dir.path(),
            root: None,
            libc_extras_dir: Path::new("/usr/lib/libc_pic"),
            search_dirs: &[],
        };
        let linker = FakeLinker::default();
        let symbols_used = vec![Symbol::new("printf", "GLIBC_2.2.5", true)];
        let outcome = reduce(
            "libc.so.6",
            Path::new("/lib/libc.so.6"),
            Some(&archive),
            None,
            Some("libc.so.6"),
            &[],
            &symbols_used,
            &ctx,
            &linker,
            &FakeObjCopy,
        )
        .expect("reduce");
        assert_eq!(outcome, ReduceOutcome::Relinked);
        assert_eq!(linker.requests.borrow().as_slice(), &["libc.so.6".to_string()]);
    }

    #[test]
    fn already_in_root_is_left_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("sysroot");
        std::fs::create_dir(&root).expect("mkdir");
        let path = root.join("libfoo.so.1");
        let ctx = ReduceContext {
            dest_dir: dir.path(),
            root: Some(&root),
            libc_extras_dir: Path::new("/usr/lib/libc_pic"),
            search_dirs: &[],
        };
        let outcome = reduce(
            "libfoo.so.1",
            &path,
            None,
            None,
            Some("libfoo.so.1"),
            &[],
            &[],
            &ctx,
            &FakeLinker::default(),
            &FakeObjCopy,
        )
        .expect("reduce");
        assert_eq!(outcome, ReduceOutcome::AlreadyInRoot);
    }

    #[test]
    fn missing_soname_skips_reduction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("libfoo_pic.a");
        std::fs::write(&archive, b"archive").expect("write");
        let ctx = ReduceContext {
            dest_dir: dir.path(),
            root: None,
            libc_extras_dir: Path::new("/usr/lib/libc_pic"),
            search_dirs: &[],
        };
        let outcome = reduce(
            "libfoo.so.1",
            Path::new("/lib/libfoo.so.1"),
            Some(&archive),
            None,
            None,
            &[],
            &[],
            &ctx,
            &FakeLinker::default(),
            &FakeObjCopy,
        )
        .expect("reduce");
        assert_eq!(outcome, ReduceOutcome::MissingSoname);
    }
}
