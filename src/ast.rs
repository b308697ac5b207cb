//! Schema AST.
//!
//! ```text
//! schema User {
//!   id     string  $id
//!   email  string  $unique
//!   name   string? $default('Unknown')
//!   role   *Role   $relation(fields: [roleId], references: [id])
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// The type token of a field: `[*]<Name>[[]][?]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    /// Type identifier with `*`, `[]` and `?` stripped.
    pub name: String,
    /// `*` prefix: the type names another model.
    pub is_model: bool,
    /// `[]` suffix: one-to-many.
    pub is_list: bool,
    /// `?` suffix.
    pub is_nullable: bool,
}

impl FieldType {
    /// Declaration form of the type, with `?` rewritten to a nullable union.
    pub fn declared(&self) -> String {
        let mut ty = self.name.clone();
        if self.is_list {
            ty.push_str("[]");
        }
        if self.is_nullable {
            ty.push_str(" | null");
        }
        ty
    }
}

/// One `$...` modifier on a field line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Modifier {
    Id,
    Unique,
    Default(Value),
    Relation { fields: String, references: String },
}

/// Link from a field to another model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub target_model: String,
    pub local_field: String,
    pub referenced_field: String,
    pub is_list: bool,
}

/// One parsed field line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: String,
    pub ty: FieldType,
    /// Explicit `?`, or implied by `$id` / `$default(...)`.
    pub is_optional: bool,
    pub is_id: bool,
    pub is_unique: bool,
    pub default: Option<Value>,
    pub relation: Option<RelationSpec>,
}

impl FieldDeclaration {
    /// `$id` and `$unique` fields can identify a single row.
    pub fn is_unique_candidate(&self) -> bool {
        self.is_id || self.is_unique
    }

    /// The raw type token as written, minus the relation marker.
    pub fn raw_type(&self) -> String {
        let mut ty = self.ty.name.clone();
        if self.ty.is_list {
            ty.push_str("[]");
        }
        if self.ty.is_nullable {
            ty.push('?');
        }
        ty
    }
}

/// One `schema <Name> { ... }` block; field order is declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub fields: Vec<FieldDeclaration>,
}

impl ModelDefinition {
    /// Find a field by name.
    pub fn find_field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|f| f.name == name)
    }
}
