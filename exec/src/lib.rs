#![doc = include_str!("../README.md")]

mod command;
mod inspector;
mod linker;
mod objcopy;

pub use self::command::prefixed;
pub use self::command::run_command;
pub use self::inspector::ExternalElfInspector;
pub use self::linker::ExternalLinker;
pub use self::objcopy::ExternalObjCopy;
