//! Sub-process-backed [`Linker`](libslim::Linker), invoking the system
//! compiler as a linker driver.

use libslim::Error;
use libslim::LinkRequest;
use libslim::Linker;

use crate::command::prefixed;
use crate::command::run_command;

/// Invokes `<target->cc` with `-shared -nostdlib -nostartfiles` plus
/// whatever [`LinkRequest`] asks for (spec §6's linker invocation contract).
pub struct ExternalLinker {
    program: String,
    target: Option<String>,
}

impl ExternalLinker {
    /// Use the default linker driver, `cc`.
    pub fn new(target: Option<String>) -> Self {
        Self::with_program("cc", target)
    }

    /// Use a specific linker driver program.
    pub fn with_program(program: impl Into<String>, target: Option<String>) -> Self {
        Self {
            program: program.into(),
            target,
        }
    }
}

impl Linker for ExternalLinker {
    fn link(&self, request: &LinkRequest) -> Result<(), Error> {
        let program = prefixed(self.target.as_deref(), &self.program);
        let mut args: Vec<String> = vec![
            "-shared".to_string(),
            "-nostdlib".to_string(),
            "-nostartfiles".to_string(),
            format!("-Wl,-soname={}", request.soname),
            "-o".to_string(),
            request.output.to_string_lossy().into_owned(),
        ];
        for dir in request.search_dirs {
            args.push(format!("-L{}", dir.display()));
        }
        if let Some(version_script) = request.version_script {
            args.push(format!("-Wl,--version-script={}", version_script.display()));
        }
        for object in request.pre_objects {
            args.push(object.to_string_lossy().into_owned());
        }
        args.push(request.pic_archive.to_string_lossy().into_owned());
        for object in request.post_objects {
            args.push(object.to_string_lossy().into_owned());
        }
        args.push("-lgcc".to_string());
        for symbol in request.force_include {
            args.push(format!("-u{symbol}"));
        }
        args.extend(request.link_libs.iter().cloned());
        run_command(&program, &args)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_the_linker_program_for_a_target() {
        let linker = ExternalLinker::new(Some("arm-linux-gnueabi".to_string()));
        assert_eq!(linker.program, "cc");
        assert_eq!(linker.target.as_deref(), Some("arm-linux-gnueabi"));
    }
}
