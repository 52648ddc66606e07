//! Partitions the input file set into binaries to analyze, hardlink
//! duplicates, scripts, and libraries (see spec §4.3).

use std::collections::BTreeMap;
use std::io::Read;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::path::PathBuf;

use fs_err as fs;
use log::trace;

use crate::patterns::is_script_shebang;
use crate::patterns::is_shared_object;
use crate::Error;

/// Map from inode number to the absolute path objects are known by.
///
/// Deduplicated by inode: once an inode is mapped, it is never re-mapped
/// (spec §3, "inode deduplication is monotonic within a run").
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    objects: BTreeMap<u64, PathBuf>,
}

impl WorkingSet {
    /// An empty working set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `path` under `inode` unless that inode is already known.
    ///
    /// Returns `true` if the object was newly inserted.
    pub fn insert(&mut self, inode: u64, path: PathBuf) -> bool {
        if self.objects.contains_key(&inode) {
            trace!("{path:?} is a hardlink to {:?}", self.objects[&inode]);
            false
        } else {
            self.objects.insert(inode, path);
            true
        }
    }

    /// Insert `path`, stat-ing it to discover its inode.
    pub fn insert_path(&mut self, path: PathBuf) -> Result<bool, Error> {
        let inode = fs::metadata(&path)?.ino();
        Ok(self.insert(inode, path))
    }

    /// Paths currently in the set, in inode order (deterministic iteration).
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.objects.values().map(PathBuf::as_path)
    }

    /// Number of distinct objects in the set.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the set has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Result of classifying the initial input file set.
#[derive(Debug, Default)]
pub struct ClassifiedInputs {
    /// Objects to analyze in subsequent passes.
    pub working_set: WorkingSet,
    /// Inputs skipped because their basename matched the shared-object
    /// pattern; only their consumers seed the working set.
    pub libraries: Vec<PathBuf>,
    /// Inputs skipped because they are scripts (shebang at file start).
    pub scripts: Vec<PathBuf>,
}

/// Classify `paths` per spec §4.3: stat for inode, then (in order) hardlink,
/// library, script, or working-set object.
pub fn classify(paths: &[PathBuf]) -> Result<ClassifiedInputs, Error> {
    let mut result = ClassifiedInputs::default();
    for path in paths {
        let metadata = fs::metadata(path)?;
        let inode = metadata.ino();
        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if result.working_set.objects.contains_key(&inode) {
            trace!(
                "{path:?} is a hardlink to {:?}",
                result.working_set.objects[&inode]
            );
            continue;
        }
        if is_shared_object(&basename) {
            trace!("{path:?} is a library");
            result.libraries.push(path.clone());
            continue;
        }
        if is_script_shebang(&read_prefix(path)?) {
            trace!("{path:?} is a script");
            result.scripts.push(path.clone());
            continue;
        }
        result.working_set.insert(inode, path.clone());
    }
    Ok(result)
}

fn read_prefix(path: &Path) -> Result<Vec<u8>, Error> {
    let mut file = fs::File::open(path)?;
    let mut buf = [0_u8; 256];
    let n = file.read(&mut buf)?;
    Ok(buf[..n].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardlinked_inputs_are_deduplicated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = dir.path().join("hello");
        std::fs::write(&original, b"not an elf").expect("write");
        let hardlink = dir.path().join("hello-copy");
        std::fs::hard_link(&original, &hardlink).expect("hardlink");
        let classified = classify(&[original.clone(), hardlink]).expect("classify");
        assert_eq!(classified.working_set.len(), 1);
    }

    #[test]
    fn libraries_and_scripts_are_set_aside() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lib = dir.path().join("libfoo.so.1");
        std::fs::write(&lib, b"").expect("write");
        let script = dir.path().join("run.sh");
        std::fs::write(&script, b"#!/bin/sh\necho hi\n").expect("write");
        let binary = dir.path().join("hello");
        std::fs::write(&binary, b"not really an elf").expect("write");
        let classified = classify(&[lib.clone(), script.clone(), binary.clone()]).expect("classify");
        assert_eq!(classified.libraries, vec![lib]);
        assert_eq!(classified.scripts, vec![script]);
        assert_eq!(classified.working_set.paths().collect::<Vec<_>>(), vec![binary.as_path()]);
    }
}
