//! Sub-process invocation shared by the inspector, linker and object-copy
//! collaborators.

use std::ffi::OsStr;
use std::process::Command;
use std::process::Stdio;

use log::trace;

use libslim::Error;

/// Run `program` with `args`, forcing `LC_ALL=C`, and return its captured
/// stdout split into trimmed, non-empty lines.
///
/// A non-zero exit status, or a failure to spawn the process at all, is
/// reported as [`Error::Subprocess`] with the captured stdout and stderr.
pub fn run_command<I, S>(program: &str, args: I) -> Result<Vec<String>, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<String> = args
        .into_iter()
        .map(|arg| arg.as_ref().to_string_lossy().into_owned())
        .collect();
    trace!("calling {program} {}", args.join(" "));
    let output = Command::new(program)
        .args(&args)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .output()
        .map_err(|err| Error::subprocess(program, args.clone(), None, err.to_string()))?;
    if !output.status.success() {
        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(Error::subprocess(
            program,
            args,
            output.status.code(),
            captured,
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Prepend `target-` to `program` when a cross-toolchain target is configured
/// (spec's `--target` option).
pub fn prefixed(target: Option<&str>, program: &str) -> String {
    match target {
        Some(target) if !target.is_empty() => format!("{target}-{program}"),
        _ => program.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_program_when_target_set() {
        assert_eq!(prefixed(Some("arm-linux-gnueabi"), "objcopy"), "arm-linux-gnueabi-objcopy");
        assert_eq!(prefixed(None, "objcopy"), "objcopy");
        assert_eq!(prefixed(Some(""), "objcopy"), "objcopy");
    }

    #[test]
    fn captures_stdout_lines_from_a_real_process() {
        let lines = run_command("printf", ["a\nb\n\nc\n"]).expect("run");
        assert_eq!(lines, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn reports_nonzero_exit_as_subprocess_error() {
        let err = run_command("sh", ["-c", "exit 7"]).unwrap_err();
        assert!(err.to_string().contains("exit status 7"));
    }
}
