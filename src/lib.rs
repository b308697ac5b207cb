//! # Avant — schema-driven query compiler
//!
//! > **Write a schema, get SQL.**
//!
//! Avant reads a small schema language describing models and compiles
//! structured find/create/update/delete requests into SQL text. It never
//! talks to a database: every operation returns a string or an error.
//!
//! ## Quick Example
//!
//! ```rust
//! use avant::prelude::*;
//!
//! let schema = "schema User {
//!   id string $id
//!   email string $unique
//!   name string? $default('Unknown')
//! }";
//!
//! let client = Client::from_schema(schema, "BLACK_")?;
//! let users = client.table("User")?;
//!
//! let sql = users.find_unique(&FindArgs::new().filter("email", "a@b.com"))?;
//! assert_eq!(sql, "SELECT * FROM BLACK_USER WHERE EMAIL = 'a@b.com'");
//!
//! let sql = users.create(&avant::record! { "email" => "x@y.com" })?;
//! assert_eq!(sql, "INSERT INTO BLACK_USER (email, name) VALUES ('x@y.com', 'Unknown');");
//! # Ok::<(), avant::error::AvantError>(())
//! ```
//!
//! ## Schema Modifiers
//!
//! | Modifier                                   | Meaning                         |
//! |--------------------------------------------|---------------------------------|
//! | `$id`                                      | Primary key (unique, optional)  |
//! | `$unique`                                  | Unique column                   |
//! | `$default(<literal>)`                      | Filled in on `create`           |
//! | `$relation(fields: [a], references: [b])`  | Join `a` to the target's `b`    |

pub mod ast;
pub mod client;
pub mod config;
pub mod error;
pub mod parser;
pub mod query;
pub mod schema;
pub mod transpiler;
pub mod value;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::client::Client;
    pub use crate::config::Config;
    pub use crate::error::*;
    pub use crate::parser::{extract_models, parse_field};
    pub use crate::query::*;
    pub use crate::schema::{Registry, RelationTarget, TableMetadata};
    pub use crate::transpiler::Table;
    pub use crate::value::{ToSql, Value};
}

/// Parse schema text into model definitions.
///
/// # Example
///
/// ```
/// use avant::parse;
///
/// let models = parse("schema User {\n id string $id\n}").unwrap();
/// assert_eq!(models[0].name, "User");
/// ```
pub fn parse(input: &str) -> Result<Vec<ast::ModelDefinition>, error::AvantError> {
    parser::extract_models(input)
}
