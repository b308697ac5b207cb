//! Compiled client: one [`Table`] per model.

use indexmap::IndexMap;

use crate::error::{AvantError, AvantResult};
use crate::query::Query;
use crate::schema::Registry;
use crate::transpiler::Table;

/// Every model of a schema, ready to compile queries.
///
/// # Example
///
/// ```
/// use avant::prelude::*;
///
/// let client = Client::from_schema("schema User {\n id string $id\n}", "BLACK_").unwrap();
/// let sql = client.table("user").unwrap().find_many(None).unwrap();
/// assert_eq!(sql, "SELECT * FROM BLACK_USER");
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    tables: IndexMap<String, Table>,
}

impl Client {
    /// Build one table per registered model.
    pub fn new(registry: &Registry) -> Self {
        let tables = registry
            .tables()
            .map(|(model, meta)| {
                tracing::debug!("Compiled table {} for model {}", meta.table_name, model);
                (model.to_string(), Table::new(meta.clone(), registry.prefix()))
            })
            .collect();
        Self { tables }
    }

    /// Parse schema text and build the client in one step.
    pub fn from_schema(text: &str, prefix: &str) -> AvantResult<Self> {
        Ok(Self::new(&Registry::parse(text, prefix)?))
    }

    /// Table for a model name (case-insensitive).
    pub fn table(&self, model: &str) -> AvantResult<&Table> {
        self.tables
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(model))
            .map(|(_, table)| table)
            .ok_or_else(|| AvantError::UnknownModel(model.to_string()))
    }

    /// Compile a request against a model.
    pub fn compile(&self, model: &str, query: &Query) -> AvantResult<String> {
        self.table(model)?.compile(query)
    }

    /// Model names in declaration order.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FindArgs;

    const SCHEMA: &str = "schema User {\n id string $id\n}\nschema Role {\n id string $id\n}";

    #[test]
    fn test_tables_in_declaration_order() {
        let client = Client::from_schema(SCHEMA, "").unwrap();
        let models: Vec<&str> = client.models().collect();
        assert_eq!(models, vec!["User", "Role"]);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let client = Client::from_schema(SCHEMA, "P_").unwrap();
        assert_eq!(client.table("role").unwrap().name(), "P_ROLE");
        assert_eq!(client.table("ROLE").unwrap().name(), "P_ROLE");
    }

    #[test]
    fn test_unknown_model() {
        let client = Client::from_schema(SCHEMA, "").unwrap();
        let err = client.table("Team").unwrap_err();
        assert!(matches!(err, AvantError::UnknownModel(name) if name == "Team"));
    }

    #[test]
    fn test_compile_through_client() {
        let client = Client::from_schema(SCHEMA, "").unwrap();
        let query = Query::FindUnique(FindArgs::new().filter("id", 7));
        assert_eq!(
            client.compile("User", &query).unwrap(),
            "SELECT * FROM USER WHERE ID = 7"
        );
    }
}
