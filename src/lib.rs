#![doc = include_str!("../README.md")]

mod classifier;
mod engine;
mod error;
mod finalizer;
mod inspector;
mod locator;
mod patterns;
mod provider;
mod reducer;
mod symbol;

pub use self::classifier::classify;
pub use self::classifier::ClassifiedInputs;
pub use self::classifier::WorkingSet;
pub use self::engine::run as run_engine;
pub use self::engine::EngineOptions;
pub use self::engine::EngineReport;
pub use self::error::Error;
pub use self::finalizer::finalize;
pub use self::inspector::ElfHeader;
pub use self::inspector::ElfInspector;
pub use self::inspector::EM_ARM;
pub use self::locator::gather_rpaths;
pub use self::locator::LibraryLocator;
pub use self::patterns::is_libc;
pub use self::patterns::is_script_shebang;
pub use self::patterns::is_shared_object;
pub use self::patterns::stem;
pub use self::provider::merge_present_symbols;
pub use self::provider::ProviderMap;
pub use self::reducer::link_library_args;
pub use self::reducer::reduce;
pub use self::reducer::staging_names;
pub use self::reducer::LinkRequest;
pub use self::reducer::Linker;
pub use self::reducer::ObjCopy;
pub use self::reducer::ReduceContext;
pub use self::reducer::ReduceOutcome;
pub use self::reducer::LIBC_SONAMES;
pub use self::symbol::Symbol;
pub use self::symbol::UndefinedSymbol;
pub use self::symbol::BASE_VERSION;
