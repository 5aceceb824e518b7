//! Database schema snapshot for the SQL domain.
//!
//! Loaded once per connection: table and column names with declared types,
//! relationships, and synonym tables. Read-only within a processing
//! session — if the underlying schema changes, the caller reloads.
//!
//! Identifier lookup goes exact name → registered synonym → fuzzy match,
//! with the resolution threshold inclusive. Automatic synonyms cover
//! underscore/space variants and English singular/plural; Polish synonyms
//! are the caller's to register (`add_table_synonym` / `add_column_synonym`).

use std::collections::BTreeMap;

use crate::fuzzy;
use crate::types::Result;

/// Default similarity threshold for identifier resolution.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

// ---------------------------------------------------------------------------
// Schema model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    /// Declared SQL type, uppercased ("INTEGER", "TEXT", ...).
    pub decl_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Outcome of one identifier lookup, mirroring the fuzzy resolver's
/// diagnostics: the accepted name, plus the best rejected candidate when
/// nothing cleared the threshold.
#[derive(Debug, Clone)]
pub struct SchemaMatch {
    pub matched: Option<String>,
    pub best_candidate: Option<String>,
    pub best_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SqlSchema {
    /// table name → columns, in declaration order.
    tables: BTreeMap<String, Vec<Column>>,
    relationships: Vec<Relationship>,
    /// table name → synonyms.
    table_synonyms: BTreeMap<String, Vec<String>>,
    /// "table.column" → synonyms.
    column_synonyms: BTreeMap<String, Vec<String>>,
}

impl SqlSchema {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub fn add_table(&mut self, name: &str, columns: &[(&str, &str)]) {
        let name = name.to_lowercase();
        let columns = columns
            .iter()
            .map(|(col, ty)| Column {
                name: col.to_lowercase(),
                decl_type: ty.to_uppercase(),
            })
            .collect();
        self.tables.insert(name.clone(), columns);
        self.add_automatic_synonyms(&name);
    }

    pub fn add_relationship(
        &mut self,
        from_table: &str,
        from_column: &str,
        to_table: &str,
        to_column: &str,
    ) {
        self.relationships.push(Relationship {
            from_table: from_table.to_lowercase(),
            from_column: from_column.to_lowercase(),
            to_table: to_table.to_lowercase(),
            to_column: to_column.to_lowercase(),
        });
    }

    pub fn add_table_synonym(&mut self, table: &str, synonym: &str) {
        let synonyms = self.table_synonyms.entry(table.to_lowercase()).or_default();
        let synonym = synonym.to_lowercase();
        if !synonyms.contains(&synonym) {
            synonyms.push(synonym);
        }
    }

    pub fn add_column_synonym(&mut self, table: &str, column: &str, synonym: &str) {
        let key = format!("{}.{}", table.to_lowercase(), column.to_lowercase());
        let synonyms = self.column_synonyms.entry(key).or_default();
        let synonym = synonym.to_lowercase();
        if !synonyms.contains(&synonym) {
            synonyms.push(synonym);
        }
    }

    /// Underscore/space variants and English singular/plural, matching what
    /// the loader generates for every table.
    fn add_automatic_synonyms(&mut self, table: &str) {
        let table = table.to_string();
        if table.contains('_') {
            self.add_table_synonym(&table, &table.replace('_', " "));
        }
        if let Some(singular) = table.strip_suffix('s') {
            if !singular.is_empty() {
                self.add_table_synonym(&table, singular);
            }
        } else {
            self.add_table_synonym(&table, &format!("{table}s"));
        }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn columns(&self, table: &str) -> Option<&[Column]> {
        self.tables.get(&table.to_lowercase()).map(Vec::as_slice)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(&table.to_lowercase())
    }

    /// The first relationship connecting the two tables, in either
    /// direction.
    pub fn relationship_between(&self, a: &str, b: &str) -> Option<&Relationship> {
        let a = a.to_lowercase();
        let b = b.to_lowercase();
        self.relationships.iter().find(|r| {
            (r.from_table == a && r.to_table == b) || (r.from_table == b && r.to_table == a)
        })
    }

    /// The first numeric, non-key column of a table — the default measure
    /// when an aggregation targets the table as a whole.
    pub fn measure_column(&self, table: &str) -> Option<&str> {
        self.columns(table)?.iter().find_map(|c| {
            let numeric = ["INT", "REAL", "NUMERIC", "DECIMAL", "FLOAT", "DOUBLE"]
                .iter()
                .any(|t| c.decl_type.contains(t));
            let key = c.name == "id" || c.name.ends_with("_id");
            (numeric && !key).then_some(c.name.as_str())
        })
    }

    /// Grouping columns for a table: its `id` column (when present)
    /// followed by the first text column — `customers` groups as
    /// `(id, name)`.
    pub fn label_columns(&self, table: &str) -> Vec<String> {
        let Some(columns) = self.columns(table) else {
            return Vec::new();
        };
        let mut labels = Vec::new();
        if columns.iter().any(|c| c.name == "id") {
            labels.push("id".to_string());
        }
        if let Some(text) = columns
            .iter()
            .find(|c| c.decl_type.contains("TEXT") || c.decl_type.contains("CHAR"))
        {
            labels.push(text.name.clone());
        }
        if labels.is_empty() {
            if let Some(first) = columns.first() {
                labels.push(first.name.clone());
            }
        }
        labels
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve a table mention: exact name, registered synonym, then fuzzy
    /// match over names and synonyms.
    pub fn find_table(&self, mention: &str, threshold: f64) -> SchemaMatch {
        let mention = mention.to_lowercase();

        if self.tables.contains_key(&mention) {
            return exact(mention);
        }
        for (table, synonyms) in &self.table_synonyms {
            if synonyms.iter().any(|s| s == &mention) {
                return exact(table.clone());
            }
        }

        // Fuzzy: candidates are table names plus synonyms mapping back to
        // their table.
        let mut best: Option<(String, f64, usize)> = None;
        for table in self.tables.keys() {
            consider(&mut best, table, table, &mention);
            for synonym in self.table_synonyms.get(table).into_iter().flatten() {
                consider(&mut best, synonym, table, &mention);
            }
        }

        finish(best, threshold)
    }

    /// Resolve a column mention within one table.
    pub fn find_column(&self, table: &str, mention: &str, threshold: f64) -> SchemaMatch {
        let table = table.to_lowercase();
        let mention = mention.to_lowercase();
        let Some(columns) = self.columns(&table) else {
            return SchemaMatch {
                matched: None,
                best_candidate: None,
                best_score: 0.0,
            };
        };

        if columns.iter().any(|c| c.name == mention) {
            return exact(mention);
        }
        for column in columns {
            let key = format!("{table}.{}", column.name);
            if self
                .column_synonyms
                .get(&key)
                .is_some_and(|syns| syns.iter().any(|s| s == &mention))
            {
                return exact(column.name.clone());
            }
        }

        let mut best: Option<(String, f64, usize)> = None;
        for column in columns {
            consider(&mut best, &column.name, &column.name, &mention);
            let key = format!("{table}.{}", column.name);
            for synonym in self.column_synonyms.get(&key).into_iter().flatten() {
                consider(&mut best, synonym, &column.name, &mention);
            }
        }

        finish(best, threshold)
    }

    // -----------------------------------------------------------------------
    // Loading from a live connection
    // -----------------------------------------------------------------------

    /// Read the schema snapshot from a SQLite connection: tables, columns,
    /// automatic synonyms, and relationships inferred from `<singular>_id`
    /// column naming.
    pub fn load_from_connection(connection: &rusqlite::Connection) -> Result<Self> {
        let mut schema = Self::new();

        let mut stmt = connection.prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let table_names: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<_, _>>()?;

        for table in &table_names {
            let mut info = connection.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
            let columns: Vec<(String, String)> = info
                .query_map([], |row| {
                    Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                })?
                .collect::<std::result::Result<_, _>>()?;

            let borrowed: Vec<(&str, &str)> = columns
                .iter()
                .map(|(n, t)| (n.as_str(), t.as_str()))
                .collect();
            schema.add_table(table, &borrowed);
        }

        schema.detect_relationships();
        Ok(schema)
    }

    /// Infer relationships from column naming: `orders.customer_id` links
    /// to `customers.id` when such a table exists.
    fn detect_relationships(&mut self) {
        let mut found = Vec::new();

        for (table, columns) in &self.tables {
            for column in columns {
                let Some(prefix) = column.name.strip_suffix("_id") else {
                    continue;
                };
                for candidate in [format!("{prefix}s"), prefix.to_string(), format!("{prefix}es")]
                {
                    let has_id = self
                        .tables
                        .get(&candidate)
                        .is_some_and(|cols| cols.iter().any(|c| c.name == "id"));
                    if has_id && candidate != *table {
                        found.push(Relationship {
                            from_table: table.clone(),
                            from_column: column.name.clone(),
                            to_table: candidate,
                            to_column: "id".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        for rel in found {
            if !self.relationships.contains(&rel) {
                self.relationships.push(rel);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup helpers
// ---------------------------------------------------------------------------

fn exact(name: String) -> SchemaMatch {
    SchemaMatch {
        matched: Some(name),
        best_candidate: None,
        best_score: 1.0,
    }
}

/// Track the best (resolved name, score); ties prefer the shorter compared
/// candidate, matching the fuzzy resolver's rule.
fn consider(
    best: &mut Option<(String, f64, usize)>,
    candidate: &str,
    resolved: &str,
    mention: &str,
) {
    let score = fuzzy::similarity(mention, candidate);
    let len = candidate.chars().count();
    let better = match best {
        None => true,
        Some((_, bs, bl)) => score > *bs || (score == *bs && len < *bl),
    };
    if better {
        *best = Some((resolved.to_string(), score, len));
    }
}

fn finish(best: Option<(String, f64, usize)>, threshold: f64) -> SchemaMatch {
    match best {
        Some((name, score, _)) if score >= threshold => SchemaMatch {
            matched: Some(name),
            best_candidate: None,
            best_score: score,
        },
        Some((name, score, _)) => SchemaMatch {
            matched: None,
            best_candidate: Some(name),
            best_score: score,
        },
        None => SchemaMatch {
            matched: None,
            best_candidate: None,
            best_score: 0.0,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_schema() -> SqlSchema {
        let mut schema = SqlSchema::new();
        schema.add_table(
            "customers",
            &[("id", "INTEGER"), ("name", "TEXT"), ("city", "TEXT")],
        );
        schema.add_table(
            "orders",
            &[("id", "INTEGER"), ("customer_id", "INTEGER"), ("amount", "REAL")],
        );
        schema.add_relationship("orders", "customer_id", "customers", "id");
        schema
    }

    #[test]
    fn test_exact_and_singular_lookup() {
        let schema = demo_schema();
        assert_eq!(
            schema.find_table("customers", DEFAULT_THRESHOLD).matched.as_deref(),
            Some("customers")
        );
        // automatic singular synonym
        assert_eq!(
            schema.find_table("customer", DEFAULT_THRESHOLD).matched.as_deref(),
            Some("customers")
        );
    }

    #[test]
    fn test_registered_synonym_resolves() {
        let mut schema = demo_schema();
        schema.add_table_synonym("customers", "klienci");
        schema.add_table_synonym("customers", "klientów");
        assert_eq!(
            schema.find_table("klientów", DEFAULT_THRESHOLD).matched.as_deref(),
            Some("customers")
        );
    }

    #[test]
    fn test_fuzzy_table_lookup() {
        let schema = demo_schema();
        // typo within edit distance
        assert_eq!(
            schema.find_table("custoemrs", DEFAULT_THRESHOLD).matched.as_deref(),
            Some("customers")
        );
    }

    #[test]
    fn test_unresolvable_reports_best_candidate() {
        let schema = demo_schema();
        let m = schema.find_table("faktury", DEFAULT_THRESHOLD);
        assert!(m.matched.is_none());
        assert!(m.best_candidate.is_some());
        assert!(m.best_score < DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_column_separator_equivalence() {
        let schema = demo_schema();
        let m = schema.find_column("orders", "customer id", DEFAULT_THRESHOLD);
        assert_eq!(m.matched.as_deref(), Some("customer_id"));
    }

    #[test]
    fn test_measure_and_label_columns() {
        let schema = demo_schema();
        assert_eq!(schema.measure_column("orders"), Some("amount"));
        assert_eq!(schema.measure_column("customers"), None);
        assert_eq!(schema.label_columns("customers"), vec!["id", "name"]);
    }

    #[test]
    fn test_relationship_detection_from_naming() {
        let mut schema = SqlSchema::new();
        schema.add_table("customers", &[("id", "INTEGER"), ("name", "TEXT")]);
        schema.add_table(
            "orders",
            &[("id", "INTEGER"), ("customer_id", "INTEGER"), ("amount", "REAL")],
        );
        schema.detect_relationships();
        let rel = schema.relationship_between("customers", "orders").unwrap();
        assert_eq!(rel.from_table, "orders");
        assert_eq!(rel.from_column, "customer_id");
        assert_eq!(rel.to_table, "customers");
        assert_eq!(rel.to_column, "id");
    }
}
