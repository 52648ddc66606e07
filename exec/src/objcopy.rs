//! Sub-process-backed [`ObjCopy`](libslim::ObjCopy), invoking the system
//! `objcopy`.

use std::path::Path;

use libslim::Error;
use libslim::ObjCopy;

use crate::command::prefixed;
use crate::command::run_command;

/// Invokes `<target->objcopy --strip-unneeded -R .note -R .comment <in> <out>`
/// (spec §6's object-copy invocation contract).
pub struct ExternalObjCopy {
    program: String,
    target: Option<String>,
}

impl ExternalObjCopy {
    /// Use the default object-copy program, `objcopy`.
    pub fn new(target: Option<String>) -> Self {
        Self::with_program("objcopy", target)
    }

    /// Use a specific object-copy program.
    pub fn with_program(program: impl Into<String>, target: Option<String>) -> Self {
        Self {
            program: program.into(),
            target,
        }
    }
}

impl ObjCopy for ExternalObjCopy {
    fn strip(&self, input: &Path, output: &Path) -> Result<(), Error> {
        let program = prefixed(self.target.as_deref(), &self.program);
        run_command(
            &program,
            [
                "--strip-unneeded",
                "-R",
                ".note",
                "-R",
                ".comment",
                &input.to_string_lossy(),
                &output.to_string_lossy(),
            ],
        )?;
        Ok(())
    }
}
