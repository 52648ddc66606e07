//! Provider-map construction and the libc tie-break (spec §4.4 steps C, F, G
//! and §4.5).

use std::collections::HashMap;

use log::trace;

use crate::patterns::is_libc;
use crate::symbol::Symbol;

/// Merge the defined symbols of several libraries into a single base-name →
/// symbol map, last write wins.
///
/// Used for the termination test's `present_symbols` (step C), which does
/// *not* apply the libc tie-break: the teacher's algorithm only special-cases
/// ties when deciding which library is *responsible* for reducing a symbol
/// (step F), not when merely checking whether the symbol is covered.
pub fn merge_present_symbols<'a>(
    libraries: impl IntoIterator<Item = &'a [Symbol]>,
) -> HashMap<String, Symbol> {
    let mut present = HashMap::new();
    for symbols in libraries {
        for symbol in symbols {
            for name in symbol.base_names() {
                present.insert(name, symbol.clone());
            }
        }
    }
    present
}

/// Maps a symbol base-name to the single library basename responsible for
/// providing it, applying the libc-preference tie-break on collisions.
#[derive(Debug, Default)]
pub struct ProviderMap {
    providers: HashMap<String, (String, Symbol)>,
}

impl ProviderMap {
    /// Build the provider map from each library's defined symbols.
    ///
    /// `libraries` must be in a stable, deterministic order (e.g. sorted
    /// basenames) so that tie-break outcomes are reproducible across runs
    /// (spec §5).
    pub fn build<'a>(libraries: impl IntoIterator<Item = (&'a str, &'a [Symbol])>) -> Self {
        let mut map = Self::default();
        for (library, symbols) in libraries {
            for symbol in symbols {
                for name in symbol.base_names() {
                    match map.providers.get(&name) {
                        Some((existing, _)) if !is_libc(library) => {
                            trace!(
                                "duplicate symbol {symbol} in {existing} and {library}, keeping {existing}"
                            );
                        }
                        _ => {
                            map.providers
                                .insert(name, (library.to_string(), symbol.clone()));
                        }
                    }
                }
            }
        }
        map
    }

    /// The library responsible for `base_name`, and the `Symbol` it provides.
    pub fn get(&self, base_name: &str) -> Option<(&str, &Symbol)> {
        self.providers
            .get(base_name)
            .map(|(library, symbol)| (library.as_str(), symbol))
    }
}
