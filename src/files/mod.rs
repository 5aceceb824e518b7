//! File-operations domain: natural-language file management.
//!
//! Pipeline: pattern match (intent + primary parameters) → supplemental
//! predicate extraction (size / age / content filters) → translation to a
//! file-op command → execution against the real filesystem.

pub mod executor;
pub mod parser;
pub mod translator;

pub use executor::FileExecutor;
pub use parser::FileParser;
pub use translator::FileTranslator;

use crate::registry::DomainRegistry;

/// The registry key for this domain.
pub const DOMAIN: &str = "file";

/// Register the complete file-operations triple.
pub fn register_into(registry: &mut DomainRegistry) {
    registry.register_domain(
        DOMAIN,
        Box::new(FileParser),
        Box::new(FileTranslator),
        Box::new(FileExecutor),
    );
}
