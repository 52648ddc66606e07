//! Defined and undefined symbol representations.
//!
//! A defined symbol has a name *and* a version, and the mapping between "what
//! you write in `-u`" (the [linker reference name](Symbol::linker_name)) and
//! "what you look up in a provider table" (the [base names](Symbol::base_names))
//! is not one-to-one: a default-versioned symbol publishes an extra `@Base`
//! alias, but is referenced unversioned at the call site.

use std::fmt;

/// The version string used for symbols that carry no real version information.
pub const BASE_VERSION: &str = "Base";

/// A symbol defined (exported) by a library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    /// Unversioned symbol name, e.g. `printf`.
    pub name: String,
    /// Version string, e.g. `GLIBC_2.2.5`, or [`BASE_VERSION`] if unversioned.
    pub version: String,
    /// Whether this is the version selected for an unversioned reference.
    pub default_version: bool,
}

impl Symbol {
    /// Create a new defined symbol.
    pub fn new(name: impl Into<String>, version: impl Into<String>, default_version: bool) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            default_version,
        }
    }

    /// The synthetic `__dso_handle` symbol force-included when relinking libc.
    ///
    /// Prevents a weak-reference crash in allocator init (`ptmalloc_init`).
    pub fn dso_handle() -> Self {
        Self::new("__dso_handle", BASE_VERSION, true)
    }

    /// Lookup keys under which this symbol is registered in a provider table.
    ///
    /// `name@version`, plus `name@Base` when [`default_version`](Self::default_version)
    /// is set and the version isn't already `Base`.
    pub fn base_names(&self) -> Vec<String> {
        let mut names = vec![format!("{}@{}", self.name, self.version)];
        if self.default_version && self.version != BASE_VERSION {
            names.push(format!("{}@{}", self.name, BASE_VERSION));
        }
        names
    }

    /// The full `-u` argument for this symbol, including an explicit version
    /// suffix when the symbol is versioned and not the default.
    pub fn linker_reference(&self) -> String {
        if self.default_version || self.version == BASE_VERSION {
            self.name.clone()
        } else {
            format!("{}@{}", self.name, self.version)
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// An undefined (referenced but not satisfied) symbol found in an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UndefinedSymbol {
    /// Unversioned symbol name.
    pub name: String,
    /// Version string the reference is bound to.
    pub version: String,
    /// Whether the dynamic loader may leave this symbol unresolved (resolves
    /// to zero rather than aborting).
    pub weak: bool,
}

impl UndefinedSymbol {
    /// Create a new undefined symbol reference.
    pub fn new(name: impl Into<String>, version: impl Into<String>, weak: bool) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            weak,
        }
    }

    /// The key under which this reference is recorded in the needed-symbols map.
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl fmt::Display for UndefinedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_names_for_default_versioned_symbol() {
        let symbol = Symbol::new("printf", "GLIBC_2.2.5", true);
        assert_eq!(
            symbol.base_names(),
            vec!["printf@GLIBC_2.2.5".to_string(), "printf@Base".to_string()]
        );
        assert_eq!(symbol.linker_reference(), "printf");
    }

    #[test]
    fn base_names_for_non_default_versioned_symbol() {
        let symbol = Symbol::new("pthread_create", "GLIBC_2.34", false);
        assert_eq!(symbol.base_names(), vec!["pthread_create@GLIBC_2.34".to_string()]);
        assert_eq!(symbol.linker_reference(), "pthread_create@GLIBC_2.34");
    }

    #[test]
    fn base_names_for_base_version_symbol() {
        let symbol = Symbol::new("__dso_handle", BASE_VERSION, true);
        assert_eq!(symbol.base_names(), vec!["__dso_handle@Base".to_string()]);
        assert_eq!(symbol.linker_reference(), "__dso_handle");
    }

    #[test]
    fn undefined_symbol_key() {
        let sym = UndefinedSymbol::new("__gmon_start__", "", true);
        assert_eq!(sym.key(), "__gmon_start__@");
    }
}
