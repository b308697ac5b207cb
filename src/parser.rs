//! Schema parser using nom.
//!
//! # Syntax Overview
//!
//! ```text
//! schema User {
//!   role *Role[]? $default('x') $relation(fields: [roleId], references: [id])
//!   ─┬── ┬──┬─┬┬ ─────┬────── ─────────────────────┬─────────────────────
//!    │   │  │ ││      │                            │
//!    │   │  │ ││      └── Modifiers ($id, $unique, $default, $relation)
//!    │   │  │ │└── Optional
//!    │   │  │ └── List (one-to-many)
//!    │   │  └── Type name
//!    │   └── Model reference
//!    └── Field name
//! }
//! ```

use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{eof, opt},
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::ast::*;
use crate::error::{AvantError, AvantResult};
use crate::value::Value;

/// Split schema text into model definitions, in declaration order.
pub fn extract_models(text: &str) -> AvantResult<Vec<ModelDefinition>> {
    let mut models = Vec::new();
    let mut rest = text;

    loop {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        let position = text.len() - trimmed.len();

        let (body, name) = model_header(trimmed).map_err(|_| {
            AvantError::parse(position, "expected `schema <Name> {`")
        })?;
        let end = body.find('}').ok_or_else(|| {
            AvantError::parse(position, format!("unterminated block for model '{}'", name))
        })?;

        let fields = body[..end]
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(parse_field)
            .collect::<AvantResult<Vec<_>>>()?;

        tracing::debug!("Extracted model '{}' with {} fields", name, fields.len());
        models.push(ModelDefinition {
            name: name.to_string(),
            fields,
        });
        rest = &body[end + 1..];
    }

    if models.is_empty() {
        return Err(AvantError::parse(0, "no `schema` block found"));
    }
    Ok(models)
}

/// Parse one field line: `<name> <type> [modifiers]`.
pub fn parse_field(line: &str) -> AvantResult<FieldDeclaration> {
    let line = line.trim();

    let (input, name) =
        identifier(line).map_err(|_| AvantError::field(line, "missing field name"))?;
    let (input, _) = multispace1::<_, nom::error::Error<&str>>(input)
        .map_err(|_| AvantError::field(line, "missing field type"))?;
    let (input, ty) =
        parse_field_type(input).map_err(|_| AvantError::field(line, "invalid field type"))?;
    let modifiers = tokenize_modifiers(input).map_err(|msg| AvantError::field(line, msg))?;

    let mut field = FieldDeclaration {
        name: name.to_string(),
        is_optional: ty.is_nullable,
        ty,
        is_id: false,
        is_unique: false,
        default: None,
        relation: None,
    };

    for modifier in modifiers {
        match modifier {
            Modifier::Id => field.is_id = true,
            Modifier::Unique => field.is_unique = true,
            Modifier::Default(value) => field.default = Some(value),
            Modifier::Relation { fields, references } => {
                field.relation = Some(RelationSpec {
                    target_model: field.ty.name.clone(),
                    local_field: fields,
                    referenced_field: references,
                    is_list: field.ty.is_list,
                });
            }
        }
    }
    field.is_optional |= field.is_id || field.default.is_some();

    Ok(field)
}

/// Split the tail of a field line into typed modifier tokens.
pub fn tokenize_modifiers(input: &str) -> Result<Vec<Modifier>, String> {
    let mut modifiers = Vec::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let (input, name) = preceded(char('$'), identifier)(rest)
            .map_err(|_| format!("unexpected token '{}'", first_word(rest)))?;

        let (input, modifier) = match name {
            "id" => (input, Modifier::Id),
            "unique" => (input, Modifier::Unique),
            "default" => {
                let (input, payload) = parenthesized(input)
                    .map_err(|_| "`$default` needs a `(...)` payload".to_string())?;
                if payload.trim().is_empty() {
                    return Err("`$default()` is empty".to_string());
                }
                (input, Modifier::Default(Value::from_literal(payload)))
            }
            "relation" => {
                let (input, payload) = parenthesized(input)
                    .map_err(|_| "`$relation` needs a `(...)` payload".to_string())?;
                let (_, (fields, references)) = relation_args(payload).map_err(|_| {
                    "expected `$relation(fields: [<name>], references: [<name>])`".to_string()
                })?;
                (
                    input,
                    Modifier::Relation {
                        fields: fields.to_string(),
                        references: references.to_string(),
                    },
                )
            }
            other => return Err(format!("unknown modifier '${}'", other)),
        };

        // Modifiers are whitespace separated.
        if !input.is_empty() && !input.starts_with(char::is_whitespace) {
            return Err(format!("unexpected token '{}'", first_word(input)));
        }
        modifiers.push(modifier);
        rest = input;
    }

    Ok(modifiers)
}

/// Parse `schema <Name> {`.
fn model_header(input: &str) -> IResult<&str, &str> {
    let (input, _) = tag("schema")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('{')(input)?;
    Ok((input, name))
}

/// Parse an identifier (model, field or type name).
fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// Parse the type token `[*]Name[[]][?]`, which must end at whitespace or end of line.
fn parse_field_type(input: &str) -> IResult<&str, FieldType> {
    let (input, (star, name, list, nullable)) =
        tuple((opt(char('*')), identifier, opt(tag("[]")), opt(char('?'))))(input)?;

    if !input.is_empty() && !input.starts_with(char::is_whitespace) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Space,
        )));
    }

    Ok((
        input,
        FieldType {
            name: name.to_string(),
            is_model: star.is_some(),
            is_list: list.is_some(),
            is_nullable: nullable.is_some(),
        },
    ))
}

/// Parse a balanced `( ... )` group, returning its contents.
///
/// Parentheses inside quoted text do not count towards nesting.
fn parenthesized(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1;
    let mut quote: Option<char> = None;

    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[i + 1..], &body[..i]));
                }
            }
            _ => {}
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Parse `fields: [a], references: [b]`.
fn relation_args(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, fields) = labelled_ident("fields")(input)?;
    let (input, _) = delimited(multispace0, char(','), multispace0)(input)?;
    let (input, references) = labelled_ident("references")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, (fields, references)))
}

/// Parse `<label>: [<ident>]`.
fn labelled_ident<'a>(label: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input| {
        let (input, _) = multispace0(input)?;
        let (input, _) = tag(label)(input)?;
        let (input, _) = delimited(multispace0, char(':'), multispace0)(input)?;
        delimited(
            char('['),
            delimited(multispace0, identifier, multispace0),
            char(']'),
        )(input)
    }
}

fn first_word(input: &str) -> &str {
    input.split_whitespace().next().unwrap_or(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_ROLE: &str = "schema User {\r\n  id string $id\r\n  email string $unique\r\n  name string? $default('Unknown')\r\n  role *Role $relation(fields: [roleId], references: [id])\r\n  roleId string\r\n  age number\r\n}\r\n\r\nschema Role {\r\n  id string $id\r\n  name string\r\n  user *User[] $relation(fields: [id], references: [roleId])\r\n}";

    #[test]
    fn test_simple_field() {
        let field = parse_field("age number").unwrap();
        assert_eq!(field.name, "age");
        assert_eq!(field.ty.name, "number");
        assert!(!field.is_optional);
        assert!(!field.is_unique_candidate());
        assert_eq!(field.default, None);
        assert_eq!(field.relation, None);
    }

    #[test]
    fn test_optional_field() {
        let field = parse_field("nickname string?").unwrap();
        assert!(field.is_optional);
        assert!(field.ty.is_nullable);
        assert_eq!(field.ty.declared(), "string | null");
        assert_eq!(field.raw_type(), "string?");
    }

    #[test]
    fn test_id_is_implicitly_optional() {
        let field = parse_field("id string $id").unwrap();
        assert!(field.is_id);
        assert!(field.is_optional);
        assert!(field.is_unique_candidate());
    }

    #[test]
    fn test_unique_field() {
        let field = parse_field("email string $unique").unwrap();
        assert!(field.is_unique);
        assert!(!field.is_optional);
    }

    #[test]
    fn test_default_string_is_unquoted() {
        let field = parse_field("name string? $default('Unknown')").unwrap();
        assert_eq!(field.default, Some(Value::from("Unknown")));
        assert!(field.is_optional);
    }

    #[test]
    fn test_default_with_parens_inside() {
        let field = parse_field("createdAt Date $default(now())").unwrap();
        assert_eq!(field.default, Some(Value::Raw("now()".to_string())));

        let field = parse_field("label string $default('a (b)') $unique").unwrap();
        assert_eq!(field.default, Some(Value::from("a (b)")));
        assert!(field.is_unique);
    }

    #[test]
    fn test_default_number() {
        let field = parse_field("age number $default(18)").unwrap();
        assert_eq!(field.default, Some(Value::Int(18)));
    }

    #[test]
    fn test_relation_field() {
        let field =
            parse_field("role *Role $relation(fields: [roleId], references: [id])").unwrap();
        assert!(field.ty.is_model);
        let rel = field.relation.unwrap();
        assert_eq!(rel.target_model, "Role");
        assert_eq!(rel.local_field, "roleId");
        assert_eq!(rel.referenced_field, "id");
        assert!(!rel.is_list);
    }

    #[test]
    fn test_list_relation_field() {
        let field =
            parse_field("user *User[] $relation(fields: [id], references: [roleId])").unwrap();
        assert!(field.ty.is_list);
        assert_eq!(field.ty.name, "User");
        assert!(field.relation.unwrap().is_list);
    }

    #[test]
    fn test_missing_type() {
        let err = parse_field("id").unwrap_err();
        assert!(matches!(err, AvantError::MalformedField { .. }));
    }

    #[test]
    fn test_empty_line() {
        let err = parse_field("   ").unwrap_err();
        assert!(matches!(err, AvantError::MalformedField { .. }));
    }

    #[test]
    fn test_unknown_modifier() {
        let err = parse_field("id string $primary").unwrap_err();
        assert!(err.to_string().contains("unknown modifier '$primary'"));
    }

    #[test]
    fn test_malformed_relation() {
        let err = parse_field("role *Role $relation(fields: roleId)").unwrap_err();
        assert!(matches!(err, AvantError::MalformedField { .. }));
    }

    #[test]
    fn test_tokenize_modifiers_order() {
        let mods = tokenize_modifiers(" $unique $default(1)  $id").unwrap();
        assert_eq!(
            mods,
            vec![Modifier::Unique, Modifier::Default(Value::Int(1)), Modifier::Id]
        );
    }

    #[test]
    fn test_extract_models() {
        let models = extract_models(USER_ROLE).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "User");
        assert_eq!(models[1].name, "Role");

        let names: Vec<&str> = models[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "name", "role", "roleId", "age"]);
    }

    #[test]
    fn test_extract_no_schema() {
        let err = extract_models("   \n ").unwrap_err();
        assert!(matches!(err, AvantError::SchemaParse { position: 0, .. }));
    }

    #[test]
    fn test_extract_unterminated_block() {
        let err = extract_models("schema User {\n id string $id\n").unwrap_err();
        assert!(err.to_string().contains("unterminated block"));
    }

    #[test]
    fn test_extract_garbage_between_blocks() {
        let err = extract_models("schema A { id string }\nfoo").unwrap_err();
        assert!(matches!(err, AvantError::SchemaParse { position: 23, .. }));
    }

    #[test]
    fn test_extract_single_line_block() {
        let models = extract_models("schema Tag { id string $id }").unwrap();
        assert_eq!(models[0].fields.len(), 1);
        assert!(models[0].fields[0].is_id);
    }
}
