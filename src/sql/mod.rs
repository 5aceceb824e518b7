//! SQL domain: natural-language query generation against a live schema.
//!
//! The caller supplies the database connection; the schema snapshot is read
//! from it once at registration. Polish identifier synonyms are registered
//! on the schema by the caller (automatic synonyms cover underscore/space
//! and English singular/plural forms).

pub mod executor;
pub mod parser;
pub mod schema;
pub mod translator;

pub use executor::SqlExecutor;
pub use parser::SqlParser;
pub use schema::{SqlSchema, DEFAULT_THRESHOLD};
pub use translator::SqlTranslator;

use crate::registry::DomainRegistry;
use crate::types::Result;

/// The registry key for this domain.
pub const DOMAIN: &str = "sql";

/// Load the schema from the connection and register the complete triple.
/// The connection moves into the executor; reload by registering again.
pub fn register_into(registry: &mut DomainRegistry, connection: rusqlite::Connection) -> Result<()> {
    let schema = SqlSchema::load_from_connection(&connection)?;
    register_with_schema(registry, schema, connection);
    Ok(())
}

/// Register with a caller-prepared schema — the path for schemas enriched
/// with synonyms or extra relationships.
pub fn register_with_schema(
    registry: &mut DomainRegistry,
    schema: SqlSchema,
    connection: rusqlite::Connection,
) {
    registry.register_domain(
        DOMAIN,
        Box::new(SqlParser),
        Box::new(SqlTranslator::new(schema)),
        Box::new(SqlExecutor::new(connection)),
    );
}
