//! The `ElfInspector` trait: the seam between the closure engine and the
//! external ELF reader it shells out to.
//!
//! Keeping this a trait (rather than calling a sub-process directly from the
//! engine) is what lets the closure/reduction logic be unit-tested with a
//! fake, the same way `elb`'s core crate is tested without going through
//! `elb-dl`'s real filesystem and process code.

use std::path::Path;
use std::path::PathBuf;

use crate::symbol::Symbol;
use crate::symbol::UndefinedSymbol;
use crate::Error;

/// The fields of an ELF header the engine cares about.
///
/// `machine` and `flags` follow the raw ELF encoding (e.g. `machine == 40`
/// is ARM); the engine doesn't need a richer enum because the only decision
/// it makes based on this struct is the old-ABI ARM workaround in step E.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    /// `ELFCLASS32` (1) or `ELFCLASS64` (2).
    pub class: u8,
    /// Byte order: `ELFDATA2LSB` (1) or `ELFDATA2MSB` (2).
    pub data: u8,
    /// `e_machine`.
    pub machine: u16,
    /// `e_flags`.
    pub flags: u32,
}

/// ELF machine value for ARM, used by the old-ABI workaround in step E.
pub const EM_ARM: u16 = 40;

impl ElfHeader {
    /// Whether this is an old-ABI ARM object (`EABI` version field is zero).
    ///
    /// Old-ABI ARM binaries implicitly depend on `libgcc_s.so.1` for
    /// software floating point and unwinding helpers that newer EABI
    /// binaries get from `libgcc` directly.
    pub fn is_old_abi_arm(&self) -> bool {
        self.machine == EM_ARM && (self.flags >> 24) == 0
    }
}

/// Wraps an external ELF reader invoked as a sub-process.
///
/// Every method takes an absolute or relative path to the object on disk and
/// fails with [`Error::Inspection`] if the path is absent or the reader
/// exits non-zero.
pub trait ElfInspector {
    /// Read the ELF header fields.
    fn header(&self, path: &Path) -> Result<ElfHeader, Error>;
    /// `DT_RPATH`/`DT_RUNPATH` entries, already joined with the configured
    /// root prefix.
    fn rpath(&self, path: &Path) -> Result<Vec<String>, Error>;
    /// `DT_NEEDED` basenames, in declaration order.
    fn needed(&self, path: &Path) -> Result<Vec<String>, Error>;
    /// `PT_INTERP`, if present.
    fn interp(&self, path: &Path) -> Result<Option<PathBuf>, Error>;
    /// `DT_SONAME`, if present.
    fn soname(&self, path: &Path) -> Result<Option<String>, Error>;
    /// Undefined symbols referenced by the object.
    fn undefined(&self, path: &Path) -> Result<Vec<UndefinedSymbol>, Error>;
    /// Symbols defined (exported) by the object.
    fn defined(&self, path: &Path) -> Result<Vec<Symbol>, Error>;
}
