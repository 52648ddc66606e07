//! Resolves library basenames to absolute paths and locates the companion
//! artifacts (`_pic.a`, `_pic.map`) a library needs to be relinked.

use std::path::Path;
use std::path::PathBuf;

use fs_err as fs;
use log::warn;

use crate::classifier::WorkingSet;
use crate::inspector::ElfInspector;
use crate::patterns::stem;
use crate::Error;

/// Gather rpaths declared by every object in `working_set`.
///
/// Per spec §4.2: rpaths only feed the search path when a filesystem root
/// is configured; otherwise each non-empty rpath is a warning, not an
/// addition to the search path.
pub fn gather_rpaths(
    working_set: &WorkingSet,
    root: Option<&Path>,
    inspector: &dyn ElfInspector,
) -> Result<Vec<PathBuf>, Error> {
    let mut rpaths = Vec::new();
    for path in working_set.paths() {
        let declared = inspector.rpath(path)?;
        if declared.is_empty() {
            continue;
        }
        if root.is_none() {
            warn!("{path:?} may need rpath, but --root not specified");
            continue;
        }
        for entry in declared {
            let entry = PathBuf::from(entry);
            if !rpaths.contains(&entry) {
                rpaths.push(entry);
            }
        }
    }
    Ok(rpaths)
}

/// Ordered library search path, plus lookup of basenames against it.
#[derive(Debug, Clone, Default)]
pub struct LibraryLocator {
    search_path: Vec<PathBuf>,
}

impl LibraryLocator {
    /// Build a locator from an already-ordered search path.
    ///
    /// Per spec §4.2, callers are expected to have assembled `search_path`
    /// as: user `-L` entries, then (unless suppressed) the default entries,
    /// then discovered rpaths.
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    /// The default library search directories used unless `-D` is given.
    pub fn default_search_path() -> Vec<PathBuf> {
        vec![
            PathBuf::from("/lib/"),
            PathBuf::from("/usr/lib/"),
            PathBuf::from("/usr/X11R6/lib/"),
        ]
    }

    /// The search path as configured, in lookup order.
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Append more directories to the end of the search path (e.g. rpaths
    /// discovered from input objects).
    pub fn extend(&mut self, dirs: impl IntoIterator<Item = PathBuf>) {
        self.search_path.extend(dirs);
    }

    /// Colon-joined rendering of the search path, for error messages.
    pub fn display_path(&self) -> String {
        self.search_path
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Find the first hit for `basename` scanning the search path in order.
    pub fn find(&self, basename: &str) -> Option<PathBuf> {
        self.search_path.iter().find_map(|dir| {
            let candidate = dir.join(basename);
            candidate.exists().then_some(candidate)
        })
    }

    /// Find `<stem>_pic.a` for a library basename.
    pub fn find_pic(&self, basename: &str) -> Option<PathBuf> {
        self.find_companion(basename, "_pic.a")
    }

    /// Find `<stem>_pic.map` (a linker version script) for a library basename.
    pub fn find_pic_map(&self, basename: &str) -> Option<PathBuf> {
        self.find_companion(basename, "_pic.map")
    }

    fn find_companion(&self, basename: &str, suffix: &str) -> Option<PathBuf> {
        let stem = stem(basename)?;
        let file_name = format!("{stem}{suffix}");
        self.search_path.iter().find_map(|dir| {
            let candidate = dir.join(&file_name);
            candidate.exists().then(|| Self::resolve_symlink(&candidate).unwrap_or(candidate))
        })
    }

    /// Follow a chain of symbolic links to its target.
    ///
    /// Relative link targets resolve against the link's own directory.
    pub fn resolve_symlink(path: &Path) -> std::io::Result<PathBuf> {
        let mut current = path.to_path_buf();
        while current.is_symlink() {
            let target = fs::read_link(&current)?;
            current = if target.is_absolute() {
                target
            } else {
                current
                    .parent()
                    .map(|parent| parent.join(&target))
                    .unwrap_or(target)
            };
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_library_in_first_matching_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lib_dir = dir.path().join("lib");
        std::fs::create_dir(&lib_dir).expect("mkdir");
        let lib_path = lib_dir.join("libfoo.so.1");
        std::fs::write(&lib_path, b"").expect("write");
        let locator = LibraryLocator::new(vec![dir.path().join("missing"), lib_dir.clone()]);
        assert_eq!(locator.find("libfoo.so.1"), Some(lib_path));
        assert_eq!(locator.find("libbar.so.1"), None);
    }

    #[test]
    fn finds_pic_archive_by_stem() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("libfoo_pic.a"), b"").expect("write");
        let locator = LibraryLocator::new(vec![dir.path().to_path_buf()]);
        assert_eq!(
            locator.find_pic("libfoo.so.1"),
            Some(dir.path().join("libfoo_pic.a"))
        );
        assert_eq!(locator.find_pic_map("libfoo.so.1"), None);
    }

    #[test]
    fn resolves_relative_symlink_chain() {
        let dir = tempfile::tempdir().expect("tempdir");
        let real = dir.path().join("real.so");
        std::fs::write(&real, b"").expect("write");
        let link1 = dir.path().join("link1.so");
        let link2 = dir.path().join("link2.so");
        std::os::unix::fs::symlink("real.so", &link1).expect("symlink");
        std::os::unix::fs::symlink("link1.so", &link2).expect("symlink");
        assert_eq!(LibraryLocator::resolve_symlink(&link2).expect("resolve"), real);
    }
}
