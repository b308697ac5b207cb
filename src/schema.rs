//! Model registry.
//!
//! Turns parsed [`ModelDefinition`]s into the query-facing [`TableMetadata`]
//! the transpiler is built from. The table prefix is passed in explicitly.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::ast::ModelDefinition;
use crate::error::{AvantError, AvantResult};
use crate::parser::extract_models;
use crate::value::Value;

/// Join columns for one relation: `<table>.<field> = <target>.<references>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTarget {
    pub field: String,
    pub references: String,
}

/// Compiled summary of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// `prefix + UPPER(model)`.
    pub table_name: String,
    /// Fields marked `$id` or `$unique`.
    pub unique_columns: IndexSet<String>,
    /// Field name to declared default.
    #[serde(with = "default_literals")]
    pub defaults: IndexMap<String, Value>,
    /// Keyed by the *target table name*, not the model name.
    pub relations: IndexMap<String, RelationTarget>,
}

impl TableMetadata {
    /// Summarise a model under the given prefix.
    pub fn from_model(model: &ModelDefinition, prefix: &str) -> Self {
        let unique_columns = model
            .fields
            .iter()
            .filter(|f| f.is_unique_candidate())
            .map(|f| f.name.clone())
            .collect();

        let defaults = model
            .fields
            .iter()
            .filter_map(|f| f.default.clone().map(|v| (f.name.clone(), v)))
            .collect();

        Self {
            table_name: table_name(prefix, &model.name),
            unique_columns,
            defaults,
            relations: resolve_relations(model, prefix),
        }
    }
}

/// Defaults keep raw SQL distinguishable from strings: `{"raw": "now()"}`.
mod default_literals {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::value::Value;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Literal<V> {
        Raw { raw: String },
        Value(V),
    }

    pub fn serialize<S: Serializer>(
        defaults: &IndexMap<String, Value>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let literals: IndexMap<&str, Literal<&Value>> = defaults
            .iter()
            .map(|(col, value)| {
                let literal = match value {
                    Value::Raw(raw) => Literal::Raw { raw: raw.clone() },
                    other => Literal::Value(other),
                };
                (col.as_str(), literal)
            })
            .collect();
        literals.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<String, Value>, D::Error> {
        let literals = IndexMap::<String, Literal<Value>>::deserialize(deserializer)?;
        Ok(literals
            .into_iter()
            .map(|(col, literal)| match literal {
                Literal::Raw { raw } => (col, Value::Raw(raw)),
                Literal::Value(value) => (col, value),
            })
            .collect())
    }
}

/// Table identifier for a model name.
pub fn table_name(prefix: &str, model: &str) -> String {
    format!("{}{}", prefix, model.to_uppercase())
}

/// Map every `$relation` field of a model to its target table.
pub fn resolve_relations(model: &ModelDefinition, prefix: &str) -> IndexMap<String, RelationTarget> {
    let mut relations = IndexMap::new();
    for field in &model.fields {
        let Some(rel) = &field.relation else {
            continue;
        };
        let key = table_name(prefix, &rel.target_model);
        let target = RelationTarget {
            field: rel.local_field.clone(),
            references: rel.referenced_field.clone(),
        };
        if relations.insert(key.clone(), target).is_some() {
            tracing::warn!(
                "{}: more than one relation to {}, keeping '{}'",
                model.name,
                key,
                field.name
            );
        }
    }
    relations
}

/// All models of a schema, plus one [`TableMetadata`] per model.
#[derive(Debug, Clone)]
pub struct Registry {
    prefix: String,
    models: Vec<ModelDefinition>,
    tables: IndexMap<String, TableMetadata>,
}

impl Registry {
    /// Parse schema text and build the registry.
    pub fn parse(text: &str, prefix: &str) -> AvantResult<Self> {
        Self::build(extract_models(text)?, prefix)
    }

    /// Build the registry from already extracted models.
    pub fn build(models: Vec<ModelDefinition>, prefix: &str) -> AvantResult<Self> {
        let mut tables = IndexMap::with_capacity(models.len());
        let mut table_names = IndexSet::with_capacity(models.len());
        for model in &models {
            // `User` and `user` map to the same table.
            if !table_names.insert(table_name(prefix, &model.name)) {
                return Err(AvantError::DuplicateModel(model.name.clone()));
            }
            tables.insert(model.name.clone(), TableMetadata::from_model(model, prefix));
        }

        let registry = Self {
            prefix: prefix.to_string(),
            models,
            tables,
        };
        registry.validate_relations()?;
        Ok(registry)
    }

    /// Every relation must name an existing model, a local field on its own
    /// model and a referenced field on the target.
    fn validate_relations(&self) -> AvantResult<()> {
        for model in &self.models {
            for field in &model.fields {
                let Some(rel) = &field.relation else {
                    continue;
                };
                let dangling = |message: String| AvantError::DanglingRelation {
                    model: model.name.clone(),
                    field: field.name.clone(),
                    message,
                };

                let target = self
                    .model(&rel.target_model)
                    .ok_or_else(|| dangling(format!("unknown model '{}'", rel.target_model)))?;
                if model.find_field(&rel.local_field).is_none() {
                    return Err(dangling(format!(
                        "'{}' is not a field of {}",
                        rel.local_field, model.name
                    )));
                }
                if target.find_field(&rel.referenced_field).is_none() {
                    return Err(dangling(format!(
                        "'{}' is not a field of {}",
                        rel.referenced_field, target.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn models(&self) -> &[ModelDefinition] {
        &self.models
    }

    /// Find a model by name.
    pub fn model(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Metadata for a model by name.
    pub fn metadata(&self, model: &str) -> Option<&TableMetadata> {
        self.tables.get(model)
    }

    /// `(model name, metadata)` pairs in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableMetadata)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Export table metadata as pretty JSON, keyed by model name.
    pub fn to_json(&self) -> AvantResult<String> {
        Ok(serde_json::to_string_pretty(&self.tables)?)
    }
}
