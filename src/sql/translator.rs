//! Translator for SQL-domain commands.
//!
//! Resolves raw table/column mentions against the schema snapshot —
//! synonyms first, then fuzzy matching — and generates the SQL text. An
//! unresolvable mention fails with `SchemaResolution` carrying the best
//! rejected candidate; there is no silent fallback.
//!
//! An aggregation target that resolves to a *table* ("sumą zamówień" →
//! orders) uses that table's first numeric non-key column as the measure
//! and joins along the schema relationship; a target that resolves to a
//! column aggregates it directly.

use crate::registry::Translator;
use crate::types::{
    CmpOp, DomainCommand, InputMode, ParamValue, ParseResult, Predicate, ProcessError, Result,
};

use super::schema::{SqlSchema, DEFAULT_THRESHOLD};
use super::DOMAIN;

pub struct SqlTranslator {
    schema: SqlSchema,
    threshold: f64,
}

impl SqlTranslator {
    pub fn new(schema: SqlSchema) -> Self {
        Self {
            schema,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(schema: SqlSchema, threshold: f64) -> Self {
        Self { schema, threshold }
    }

    pub fn schema(&self) -> &SqlSchema {
        &self.schema
    }
}

impl Translator for SqlTranslator {
    fn translate(&self, parsed: &ParseResult) -> Result<DomainCommand> {
        match parsed.intent.as_str() {
            "select_top_aggregate" => self.translate_top_aggregate(parsed),
            "select_all" => self.translate_select(parsed),
            "count_rows" => self.translate_count(parsed),
            "delete_rows" => self.translate_delete(parsed),
            other => Err(ProcessError::InvalidParameter {
                intent: other.to_string(),
                name: "intent".to_string(),
                reason: "not a sql-domain intent".to_string(),
            }),
        }
    }
}

impl SqlTranslator {
    // -----------------------------------------------------------------------
    // Resolution helpers
    // -----------------------------------------------------------------------

    fn resolve_table(&self, mention: &str) -> Result<String> {
        let m = self.schema.find_table(mention, self.threshold);
        m.matched.ok_or(ProcessError::SchemaResolution {
            token: mention.to_string(),
            best_candidate: m.best_candidate,
            best_score: m.best_score,
        })
    }

    fn resolve_column(&self, table: &str, mention: &str) -> Result<String> {
        let m = self.schema.find_column(table, mention, self.threshold);
        m.matched.ok_or(ProcessError::SchemaResolution {
            token: mention.to_string(),
            best_candidate: m.best_candidate,
            best_score: m.best_score,
        })
    }

    fn conditions(&self, parsed: &ParseResult, table: &str) -> Result<Vec<Predicate>> {
        let mut predicates = Vec::new();

        for index in 0.. {
            let Some(mention) = parsed.get_str(&format!("where_{index}_field")) else {
                break;
            };
            let column = self.resolve_column(table, mention)?;
            let op = match parsed.require_str(&format!("where_{index}_op"))? {
                ">" => CmpOp::Gt,
                "<" => CmpOp::Lt,
                ">=" => CmpOp::Ge,
                "<=" => CmpOp::Le,
                "=" => CmpOp::Eq,
                "<>" => CmpOp::Ne,
                "like" => CmpOp::Contains,
                other => {
                    return Err(ProcessError::InvalidParameter {
                        intent: parsed.intent.clone(),
                        name: format!("where_{index}_op"),
                        reason: format!("unknown comparison '{other}'"),
                    })
                }
            };
            let value = parsed
                .parameters
                .get(&format!("where_{index}_value"))
                .cloned()
                .ok_or_else(|| ProcessError::InvalidParameter {
                    intent: parsed.intent.clone(),
                    name: format!("where_{index}_value"),
                    reason: "condition value is missing".to_string(),
                })?;

            predicates.push(Predicate {
                field: column,
                op,
                value,
            });
        }

        Ok(predicates)
    }

    fn limit(&self, parsed: &ParseResult) -> Result<i64> {
        let n = parsed.require_num("limit")?;
        if n < 1.0 || n.fract() != 0.0 {
            return Err(ProcessError::InvalidParameter {
                intent: parsed.intent.clone(),
                name: "limit".to_string(),
                reason: format!("limit must be a positive whole number, got {n}"),
            });
        }
        Ok(n as i64)
    }

    // -----------------------------------------------------------------------
    // Query shapes
    // -----------------------------------------------------------------------

    fn translate_top_aggregate(&self, parsed: &ParseResult) -> Result<DomainCommand> {
        let table = self.resolve_table(parsed.require_str("table")?)?;
        let agg = parsed.require_str("agg")?.to_string();
        let limit = self.limit(parsed)?;

        let direction = match parsed.get_str("direction").unwrap_or("largest") {
            "largest" | "descending" => "DESC",
            "smallest" | "ascending" => "ASC",
            other => {
                return Err(ProcessError::InvalidParameter {
                    intent: parsed.intent.clone(),
                    name: "direction".to_string(),
                    reason: format!("expected largest/smallest, got '{other}'"),
                })
            }
        };

        // The measure mention may name a related table or a column.
        let mention = parsed.require_str("measure")?;
        let table_match = self.schema.find_table(mention, self.threshold);
        let (measure_table, measure_column) = match table_match.matched {
            Some(resolved) if resolved != table => {
                let column = if agg == "COUNT" {
                    None
                } else {
                    Some(
                        self.schema
                            .measure_column(&resolved)
                            .ok_or_else(|| ProcessError::InvalidParameter {
                                intent: parsed.intent.clone(),
                                name: "measure".to_string(),
                                reason: format!("table '{resolved}' has no numeric column to aggregate"),
                            })?
                            .to_string(),
                    )
                };
                (resolved, column)
            }
            _ => {
                let column_match = self.schema.find_column(&table, mention, self.threshold);
                match column_match.matched {
                    Some(column) => (table.clone(), Some(column)),
                    None => {
                        // Report whichever lookup came closer.
                        let (best_candidate, best_score) =
                            if table_match.best_score >= column_match.best_score {
                                (table_match.best_candidate, table_match.best_score)
                            } else {
                                (column_match.best_candidate, column_match.best_score)
                            };
                        return Err(ProcessError::SchemaResolution {
                            token: mention.to_string(),
                            best_candidate,
                            best_score,
                        });
                    }
                }
            }
        };

        let agg_expr = match &measure_column {
            Some(column) => format!("{agg}({measure_table}.{column})"),
            None => "COUNT(*)".to_string(),
        };
        let alias = format!(
            "{}_{}",
            agg.to_lowercase(),
            measure_column.as_deref().unwrap_or(&measure_table)
        );

        let group_cols: Vec<String> = self
            .schema
            .label_columns(&table)
            .into_iter()
            .map(|c| format!("{table}.{c}"))
            .collect();
        if group_cols.is_empty() {
            return Err(ProcessError::InvalidParameter {
                intent: parsed.intent.clone(),
                name: "table".to_string(),
                reason: format!("table '{table}' has no columns to group by"),
            });
        }

        let mut sql = format!("SELECT {}, {agg_expr} AS {alias} FROM {table}", group_cols.join(", "));
        if measure_table != table {
            let rel = self
                .schema
                .relationship_between(&table, &measure_table)
                .ok_or_else(|| ProcessError::InvalidParameter {
                    intent: parsed.intent.clone(),
                    name: "measure".to_string(),
                    reason: format!("no relationship between '{table}' and '{measure_table}'"),
                })?;
            sql.push_str(&format!(
                " JOIN {measure_table} ON {}.{} = {}.{}",
                rel.from_table, rel.from_column, rel.to_table, rel.to_column
            ));
        }
        sql.push_str(&format!(
            " GROUP BY {} ORDER BY {agg_expr} {direction} LIMIT {limit}",
            group_cols.join(", ")
        ));

        Ok(DomainCommand {
            domain: DOMAIN.to_string(),
            operation: "select".to_string(),
            args: vec![
                ("table".to_string(), ParamValue::Str(table)),
                ("measure".to_string(), ParamValue::Str(
                    measure_column.unwrap_or_else(|| measure_table.clone()),
                )),
                ("agg".to_string(), ParamValue::Str(agg)),
                ("direction".to_string(), ParamValue::Str(direction.to_string())),
                ("limit".to_string(), ParamValue::Num(limit as f64)),
            ],
            predicates: vec![],
            input_mode: InputMode::Independent,
            rendered: sql,
        })
    }

    fn translate_select(&self, parsed: &ParseResult) -> Result<DomainCommand> {
        let table = self.resolve_table(parsed.require_str("table")?)?;
        let predicates = self.conditions(parsed, &table)?;

        let mut sql = format!("SELECT * FROM {table}");
        let mut args = vec![("table".to_string(), ParamValue::Str(table.clone()))];

        if !predicates.is_empty() {
            sql.push_str(&format!(" WHERE {}", render_where(&predicates)));
        }
        if let Some(order_mention) = parsed.get_str("order_by") {
            let column = self.resolve_column(&table, order_mention)?;
            let dir = match parsed.get_str("order_dir") {
                Some("desc") => "DESC",
                _ => "ASC",
            };
            sql.push_str(&format!(" ORDER BY {table}.{column} {dir}"));
            args.push(("order_by".to_string(), ParamValue::Str(column)));
        }
        if parsed.get_num("limit").is_some() {
            let limit = self.limit(parsed)?;
            sql.push_str(&format!(" LIMIT {limit}"));
            args.push(("limit".to_string(), ParamValue::Num(limit as f64)));
        }

        Ok(DomainCommand {
            domain: DOMAIN.to_string(),
            operation: "select".to_string(),
            args,
            predicates,
            input_mode: InputMode::Independent,
            rendered: sql,
        })
    }

    fn translate_count(&self, parsed: &ParseResult) -> Result<DomainCommand> {
        let table = self.resolve_table(parsed.require_str("table")?)?;
        let predicates = self.conditions(parsed, &table)?;

        let mut sql = format!("SELECT COUNT(*) AS count FROM {table}");
        if !predicates.is_empty() {
            sql.push_str(&format!(" WHERE {}", render_where(&predicates)));
        }

        Ok(DomainCommand {
            domain: DOMAIN.to_string(),
            operation: "count".to_string(),
            args: vec![("table".to_string(), ParamValue::Str(table))],
            predicates,
            input_mode: InputMode::Independent,
            rendered: sql,
        })
    }

    fn translate_delete(&self, parsed: &ParseResult) -> Result<DomainCommand> {
        let table = self.resolve_table(parsed.require_str("table")?)?;
        let predicates = self.conditions(parsed, &table)?;

        let mut sql = format!("DELETE FROM {table}");
        if !predicates.is_empty() {
            sql.push_str(&format!(" WHERE {}", render_where(&predicates)));
        }

        Ok(DomainCommand {
            domain: DOMAIN.to_string(),
            operation: "delete".to_string(),
            args: vec![("table".to_string(), ParamValue::Str(table))],
            predicates,
            input_mode: InputMode::Independent,
            rendered: sql,
        })
    }
}

// ---------------------------------------------------------------------------
// SQL rendering
// ---------------------------------------------------------------------------

fn render_where(predicates: &[Predicate]) -> String {
    predicates
        .iter()
        .map(render_condition)
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn render_condition(p: &Predicate) -> String {
    match p.op {
        CmpOp::Contains => format!("{} LIKE '%{}%'", p.field, escape(&p.value.to_string())),
        CmpOp::NotContains => format!("{} NOT LIKE '%{}%'", p.field, escape(&p.value.to_string())),
        op => match &p.value {
            ParamValue::Num(_) => format!("{} {} {}", p.field, op, p.value),
            ParamValue::Str(s) => format!("{} {} '{}'", p.field, op, escape(s)),
        },
    }
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Parser;
    use crate::sql::SqlParser;

    fn demo_schema() -> SqlSchema {
        let mut schema = SqlSchema::new();
        schema.add_table(
            "customers",
            &[("id", "INTEGER"), ("name", "TEXT"), ("age", "INTEGER")],
        );
        schema.add_table(
            "orders",
            &[("id", "INTEGER"), ("customer_id", "INTEGER"), ("amount", "REAL")],
        );
        schema.add_relationship("orders", "customer_id", "customers", "id");
        schema.add_table_synonym("customers", "klienci");
        schema.add_table_synonym("customers", "klientów");
        schema.add_table_synonym("orders", "zamówienia");
        schema.add_table_synonym("orders", "zamówień");
        schema
    }

    fn translate(text: &str) -> Result<DomainCommand> {
        let parsed = SqlParser.parse(text)?;
        SqlTranslator::new(demo_schema()).translate(&parsed)
    }

    #[test]
    fn test_top_customers_by_order_sum() {
        let cmd = translate("pokaż 10 najlepszych klientów z największą sumą zamówień").unwrap();
        let sql = &cmd.rendered;
        assert!(sql.starts_with("SELECT customers.id, customers.name"), "sql: {sql}");
        assert!(sql.contains("SUM(orders.amount)"), "sql: {sql}");
        assert!(sql.contains("JOIN orders ON orders.customer_id = customers.id"), "sql: {sql}");
        assert!(sql.contains("GROUP BY customers.id, customers.name"), "sql: {sql}");
        assert!(sql.contains("ORDER BY SUM(orders.amount) DESC"), "sql: {sql}");
        assert!(sql.ends_with("LIMIT 10"), "sql: {sql}");
    }

    #[test]
    fn test_select_with_resolved_condition() {
        let cmd = translate("pokaż klientów z wiek powyżej 30");
        // "wiek" is not a column; resolution must fail loudly...
        let err = cmd.unwrap_err();
        match err {
            ProcessError::SchemaResolution { token, best_candidate, .. } => {
                assert_eq!(token, "wiek");
                assert!(best_candidate.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_select_with_synonym_condition() {
        let parsed = SqlParser.parse("pokaż klientów z wiek powyżej 30").unwrap();
        let mut schema = demo_schema();
        schema.add_column_synonym("customers", "age", "wiek");
        let cmd = SqlTranslator::new(schema).translate(&parsed).unwrap();
        assert_eq!(cmd.rendered, "SELECT * FROM customers WHERE age > 30");
        assert_eq!(cmd.predicates[0].op, CmpOp::Gt);
    }

    #[test]
    fn test_count_rows() {
        let cmd = translate("policz zamówienia").unwrap();
        assert_eq!(cmd.operation, "count");
        assert_eq!(cmd.rendered, "SELECT COUNT(*) AS count FROM orders");
    }

    #[test]
    fn test_delete_rows() {
        let cmd = translate("usuń klientów z age > 90").unwrap();
        assert_eq!(cmd.operation, "delete");
        assert_eq!(cmd.rendered, "DELETE FROM customers WHERE age > 90");
    }

    #[test]
    fn test_unresolvable_table_fails_with_diagnostics() {
        let err = translate("pokaż faktury").unwrap_err();
        match err {
            ProcessError::SchemaResolution { token, best_candidate, best_score } => {
                assert_eq!(token, "faktury");
                assert!(best_candidate.is_some());
                assert!(best_score < DEFAULT_THRESHOLD);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_string_values_are_escaped() {
        let parsed = SqlParser
            .parse("show customers with name equal \"o'brien\"")
            .unwrap();
        let cmd = SqlTranslator::new(demo_schema()).translate(&parsed).unwrap();
        assert!(cmd.rendered.contains("name = 'o''brien'"), "sql: {}", cmd.rendered);
    }
}
