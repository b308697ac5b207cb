//! Literal values and their SQL text form.
//!
//! Every value that ends up in generated SQL passes through [`ToSql`]:
//!
//! | Value            | SQL text                     |
//! |------------------|------------------------------|
//! | `Null`           | `NULL`                       |
//! | `Bool`/`Int`/`Float` | natural form, unquoted   |
//! | `String`         | `'text'` (inner `'` doubled) |
//! | `Date`           | `'YYYY-MM-DD HH:MM:SS'`      |
//! | `List`           | `(a, b, c)`                  |
//! | `Raw`            | verbatim                     |

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// strftime pattern for date literals: no timezone, no fraction, space separator.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Trait for converting values to SQL text.
pub trait ToSql {
    /// Convert this value to a SQL literal.
    fn to_sql(&self) -> String;
}

/// A literal value supplied by a caller or declared as a schema default.
///
/// Deserialization is untagged; ISO-8601 datetime strings
/// (`2024-03-05T08:09:10`) become [`Value::Date`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDateTime),
    String(String),
    List(Vec<Value>),
    /// SQL text emitted as-is, e.g. a `$default(now())` expression.
    Raw(String),
}

impl Value {
    /// Interpret the payload of a `$default(...)` modifier.
    ///
    /// Quoted text is unquoted into a string; `true`/`false`/`null` and
    /// numbers keep their type; anything else is kept as raw SQL.
    pub fn from_literal(text: &str) -> Self {
        let text = text.trim();
        if let Some(inner) = unquote(text) {
            return Value::String(inner.to_string());
        }
        match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "null" | "NULL" => Value::Null,
            _ => {
                if let Ok(n) = text.parse::<i64>() {
                    Value::Int(n)
                } else if let Ok(f) = text.parse::<f64>() {
                    Value::Float(f)
                } else {
                    Value::Raw(text.to_string())
                }
            }
        }
    }

    /// Text used inside a `LIKE` pattern: strings without their quotes,
    /// dates in literal format, everything else in SQL form.
    pub fn pattern_text(&self) -> String {
        match self {
            Value::String(s) => escape(s),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            other => other.to_sql(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Date(d) => format!("'{}'", d.format(DATE_FORMAT)),
            Value::String(s) => format!("'{}'", escape(s)),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_sql()).collect();
                format!("({})", items.join(", "))
            }
            Value::Raw(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Strip one matching pair of single or double quotes.
fn unquote(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return Some(&text[1..text.len() - 1]);
        }
    }
    None
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
