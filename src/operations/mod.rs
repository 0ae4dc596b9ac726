//! Client startup operations.

mod clipboard;
mod configuration;
mod runtime_connection;

pub use clipboard::ClipboardOperation;
pub use configuration::ConfigurationOperation;
pub use runtime_connection::RuntimeConnectionOperation;

#[cfg(test)]
pub(crate) mod testing;
