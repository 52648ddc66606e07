use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the closure engine and its collaborators.
#[derive(Error, Debug)]
pub enum Error {
    /// The ELF inspector failed to read or parse an object.
    #[error("failed to inspect {path:?}: {message}")]
    Inspection {
        /// Path that was being inspected.
        path: PathBuf,
        /// Reason given by the inspector.
        message: String,
    },
    /// A needed library basename did not resolve on the library path.
    #[error("library not found: {library} (searched: {searched})")]
    LibraryNotFound {
        /// Basename of the library that could not be located.
        library: String,
        /// Colon-joined list of directories that were searched.
        searched: String,
    },
    /// No dynamic loader was configured and none could be auto-detected.
    #[error("dynamic linker not found, aborting")]
    LoaderNotFound,
    /// A non-weak undefined symbol had no provider after a no-progress pass.
    #[error("unresolvable symbol: {0}")]
    UnresolvableSymbol(String),
    /// An invoked sub-process exited non-zero, or could not be started at all.
    #[error("command failed: {command} {args}{status}\nwith output:\n{output}")]
    Subprocess {
        /// Program name that was invoked.
        command: String,
        /// Space-joined arguments passed to the program.
        args: String,
        /// Human-readable exit status, or a note that the process never started.
        status: String,
        /// Captured stdout/stderr.
        output: String,
    },
    /// Input/output error not otherwise classified above.
    #[error("input/output error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::Subprocess`] from a command invocation.
    pub fn subprocess(
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        status: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        let args = args
            .into_iter()
            .map(Into::into)
            .collect::<Vec<_>>()
            .join(" ");
        let status = match status {
            Some(code) => format!(" (exit status {code})"),
            None => " (failed to start)".to_string(),
        };
        Self::Subprocess {
            command: command.into(),
            args,
            status,
            output: output.into(),
        }
    }
}
