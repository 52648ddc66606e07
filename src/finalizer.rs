//! Canonicalizes staged artifacts into their final names and stages the
//! dynamic loader (spec §4.7).

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use fs_err as fs;
use log::debug;
use log::info;

use crate::inspector::ElfInspector;
use crate::patterns::is_shared_object;
use crate::reducer::ObjCopy;
use crate::Error;

/// Mode the dynamic loader ends up with in the destination directory.
const LOADER_MODE: u32 = 0o755;

/// Run the finalization steps against `dest_dir`.
///
/// `ldlib` is the absolute path to the dynamic loader on the source
/// filesystem (used only if it isn't already present in `dest_dir`).
pub fn finalize(
    dest_dir: &Path,
    ldlib: &Path,
    inspector: &dyn ElfInspector,
    objcopy: &dyn ObjCopy,
) -> Result<(), Error> {
    rename_staged_artifacts(dest_dir)?;
    canonicalize_sonames(dest_dir, inspector)?;
    stage_loader(dest_dir, ldlib, objcopy)?;
    Ok(())
}

fn rename_staged_artifacts(dest_dir: &Path) -> Result<(), Error> {
    for entry in fs::read_dir(dest_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(canonical) = name.strip_suffix("-so-stripped") {
            debug!("renaming {name} to {canonical}");
            fs::rename(entry.path(), dest_dir.join(canonical))?;
        }
    }
    for entry in fs::read_dir(dest_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with("-so") {
            debug!("removing intermediate {name}");
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn canonicalize_sonames(dest_dir: &Path, inspector: &dyn ElfInspector) -> Result<(), Error> {
    for entry in fs::read_dir(dest_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_shared_object(&name) {
            continue;
        }
        let path = entry.path();
        let metadata = fs::symlink_metadata(&path)?;
        if metadata.is_symlink() {
            debug!("unlinking stale symlink {name}");
            fs::remove_file(&path)?;
            continue;
        }
        if let Some(soname) = inspector.soname(&path)? {
            if soname != name {
                debug!("moving {name} to {soname}");
                fs::rename(&path, dest_dir.join(soname))?;
            }
        }
    }
    Ok(())
}

fn stage_loader(dest_dir: &Path, ldlib: &Path, objcopy: &dyn ObjCopy) -> Result<(), Error> {
    let basename = ldlib
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staged = dest_dir.join(&basename);
    if !staged.exists() {
        info!("stripping and copying dynamic linker");
        objcopy.strip(ldlib, &staged)?;
    }
    let mut permissions = fs::metadata(&staged)?.permissions();
    permissions.set_mode(LOADER_MODE);
    fs::set_permissions(&staged, permissions)?;
    Ok(())
}
