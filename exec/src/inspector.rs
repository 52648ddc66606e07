//! Sub-process-backed [`ElfInspector`](libslim::ElfInspector), shelling out to
//! the `mklibs-readelf` companion program (spec's ELF reader contract).

use std::path::Path;
use std::path::PathBuf;

use libslim::ElfHeader;
use libslim::ElfInspector;
use libslim::Error;
use libslim::Symbol;
use libslim::UndefinedSymbol;

use crate::command::run_command;

/// Shells out to an external ELF reader for every [`ElfInspector`] method.
///
/// The reader program is invoked as `<reader> --print-<thing> <path>`, one
/// query per call; `mklibs-readelf` is the default, matching the original
/// tool's own helper program.
pub struct ExternalElfInspector {
    reader: String,
    root: Option<PathBuf>,
}

impl ExternalElfInspector {
    /// Use the default reader program, `mklibs-readelf`.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self::with_reader("mklibs-readelf", root)
    }

    /// Use a specific reader program, e.g. for tests or an alternate build.
    pub fn with_reader(reader: impl Into<String>, root: Option<PathBuf>) -> Self {
        Self {
            reader: reader.into(),
            root,
        }
    }

    fn query(&self, flag: &str, path: &Path) -> Result<Vec<String>, Error> {
        run_command(&self.reader, [flag, &path.to_string_lossy()])
    }
}

impl ElfInspector for ExternalElfInspector {
    fn header(&self, path: &Path) -> Result<ElfHeader, Error> {
        let lines = self.query("--print-elf-header", path)?;
        let line = lines.first().ok_or_else(|| Error::Inspection {
            path: path.to_path_buf(),
            message: "--print-elf-header produced no output".to_string(),
        })?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let parse = |index: usize| -> Result<u32, Error> {
            fields
                .get(index)
                .and_then(|field| field.parse::<u32>().ok())
                .ok_or_else(|| Error::Inspection {
                    path: path.to_path_buf(),
                    message: format!("malformed ELF header line: {line:?}"),
                })
        };
        Ok(ElfHeader {
            class: parse(0)? as u8,
            data: parse(1)? as u8,
            machine: parse(2)? as u16,
            flags: parse(3)?,
        })
    }

    fn rpath(&self, path: &Path) -> Result<Vec<String>, Error> {
        let entries = self.query("--print-rpath", path)?;
        Ok(match &self.root {
            Some(root) => entries
                .into_iter()
                .map(|entry| root.join(entry.trim_start_matches('/')).to_string_lossy().into_owned())
                .collect(),
            None => entries,
        })
    }

    fn needed(&self, path: &Path) -> Result<Vec<String>, Error> {
        self.query("--print-needed", path)
    }

    fn interp(&self, path: &Path) -> Result<Option<PathBuf>, Error> {
        Ok(self.query("--print-interp", path)?.pop().map(PathBuf::from))
    }

    fn soname(&self, path: &Path) -> Result<Option<String>, Error> {
        Ok(self.query("--print-soname", path)?.pop())
    }

    fn undefined(&self, path: &Path) -> Result<Vec<UndefinedSymbol>, Error> {
        self.query("--print-symbols-undefined", path)?
            .into_iter()
            .map(|line| parse_undefined(path, &line))
            .collect()
    }

    fn defined(&self, path: &Path) -> Result<Vec<Symbol>, Error> {
        self.query("--print-symbols-provided", path)?
            .into_iter()
            .map(|line| parse_defined(path, &line))
            .collect()
    }
}

fn parse_undefined(path: &Path, line: &str) -> Result<UndefinedSymbol, Error> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (name, weak, version) = match fields.as_slice() {
        [name, weak, version, ..] => (*name, *weak, *version),
        _ => {
            return Err(Error::Inspection {
                path: path.to_path_buf(),
                message: format!("malformed undefined-symbol line: {line:?}"),
            })
        }
    };
    Ok(UndefinedSymbol::new(name, version, parse_bool(path, weak)?))
}

fn parse_defined(path: &Path, line: &str) -> Result<Symbol, Error> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (name, version, default_version) = match fields.as_slice() {
        [name, _weak, version, default_version, ..] => (*name, *version, *default_version),
        _ => {
            return Err(Error::Inspection {
                path: path.to_path_buf(),
                message: format!("malformed provided-symbol line: {line:?}"),
            })
        }
    };
    Ok(Symbol::new(name, version, parse_bool(path, default_version)?))
}

fn parse_bool(path: &Path, field: &str) -> Result<bool, Error> {
    match field {
        "True" | "true" | "1" => Ok(true),
        "False" | "false" | "0" => Ok(false),
        other => Err(Error::Inspection {
            path: path.to_path_buf(),
            message: format!("expected a boolean field, found {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_undefined_symbol_line() {
        let symbol = parse_undefined(Path::new("a.out"), "printf True GLIBC_2.2.5").expect("parse");
        assert_eq!(symbol, UndefinedSymbol::new("printf", "GLIBC_2.2.5", true));
    }

    #[test]
    fn parses_defined_symbol_line() {
        let symbol = parse_defined(Path::new("libc.so.6"), "printf False GLIBC_2.2.5 True").expect("parse");
        assert_eq!(symbol, Symbol::new("printf", "GLIBC_2.2.5", true));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_undefined(Path::new("a.out"), "printf").is_err());
        assert!(parse_defined(Path::new("a.out"), "printf False").is_err());
    }

    #[test]
    fn joins_rpath_entries_against_configured_root() {
        let inspector = ExternalElfInspector::with_reader("true", Some(PathBuf::from("/srv/root")));
        assert_eq!(inspector.root, Some(PathBuf::from("/srv/root")));
    }
}
