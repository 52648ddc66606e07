//! Shared-object basename and script shebang patterns (see spec §6).

use std::sync::OnceLock;

use regex::Regex;

fn so_pattern() -> &'static Regex {
    static SO_PATTERN: OnceLock<Regex> = OnceLock::new();
    SO_PATTERN.get_or_init(|| {
        Regex::new(r"^((lib|ld).*)\.so(\..+)*$").expect("static regex is valid")
    })
}

/// Whether `basename` looks like a shared object, per the `(lib|ld).*\.so(\..+)*` pattern.
pub fn is_shared_object(basename: &str) -> bool {
    so_pattern().is_match(basename)
}

/// The stem of a shared-object basename (capture group 1), used to find
/// `<stem>_pic.a` and `<stem>_pic.map`.
///
/// Returns `None` if `basename` doesn't match the shared-object pattern.
pub fn stem(basename: &str) -> Option<&str> {
    so_pattern()
        .captures(basename)
        .map(|c| c.get(1).expect("group 1 always present on match").as_str())
}

fn libc_pattern() -> &'static Regex {
    static LIBC_PATTERN: OnceLock<Regex> = OnceLock::new();
    LIBC_PATTERN.get_or_init(|| Regex::new(r"^libc[.-]").expect("static regex is valid"))
}

/// Whether `library` should win provider ties (the libc-preference rule,
/// spec §4.4 step F / §4.5).
pub fn is_libc(library: &str) -> bool {
    libc_pattern().is_match(library)
}

/// Whether the first bytes of a file (up to 256) begin with a script
/// shebang: `#!` followed by optional whitespace then `/`.
pub fn is_script_shebang(prefix: &[u8]) -> bool {
    let Some(rest) = prefix.strip_prefix(b"#!") else {
        return false;
    };
    let trimmed = rest
        .iter()
        .position(|&b| !b.is_ascii_whitespace())
        .map(|i| &rest[i..])
        .unwrap_or(&[]);
    trimmed.first() == Some(&b'/')
}
