//! Attribute validation against the hub's accepted value ranges.
//!
//! The schema is fixed and known at compile time. Each recognized state
//! attribute carries one of three constraint kinds: a boolean check, an
//! inclusive numeric range (applied element-wise to sequences, which covers
//! the xy color pair), or a small enumeration of accepted tokens. Every
//! mutating request is checked here before anything is sent to the hub.

use crate::error::HueError;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Integer,
    Real,
}

/// One accepted token of an enumeration constraint. `None` stands for the
/// JSON null the hub accepts to clear the `effect` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    None,
    Text(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub enum Constraint {
    Bool,
    Range { min: f64, max: f64, kind: NumericKind },
    Enumeration(&'static [Token]),
}

const SCHEMA: &[(&str, Constraint)] = &[
    ("on", Constraint::Bool),
    ("bri", Constraint::Range { min: 0.0, max: 254.0, kind: NumericKind::Integer }),
    ("hue", Constraint::Range { min: 0.0, max: 65535.0, kind: NumericKind::Integer }),
    ("sat", Constraint::Range { min: 0.0, max: 254.0, kind: NumericKind::Integer }),
    ("xy", Constraint::Range { min: 0.0, max: 0.9, kind: NumericKind::Real }),
    ("ct", Constraint::Range { min: 154.0, max: 500.0, kind: NumericKind::Integer }),
    ("alert", Constraint::Enumeration(&[Token::Text("select"), Token::Text("lselect")])),
    ("effect", Constraint::Enumeration(&[Token::None])),
    ("reachable", Constraint::Bool),
];

/// Look up the constraint for a state attribute name.
pub fn constraint(attr: &str) -> Result<&'static Constraint, HueError> {
    SCHEMA
        .iter()
        .find(|(name, _)| *name == attr)
        .map(|(_, c)| c)
        .ok_or_else(|| HueError::UnknownAttribute(attr.to_string()))
}

/// Check a proposed value against the schema. Unrecognized names fail with
/// `UnknownAttribute`; recognized names with out-of-schema values fail with
/// `InvalidAttributeValue`.
pub fn validate(attr: &str, value: &Value) -> Result<(), HueError> {
    if accepts(constraint(attr)?, value) {
        Ok(())
    } else {
        Err(HueError::InvalidAttributeValue {
            attr: attr.to_string(),
            value: value.clone(),
        })
    }
}

fn accepts(constraint: &Constraint, value: &Value) -> bool {
    match constraint {
        Constraint::Bool => value.is_boolean(),
        Constraint::Range { min, max, .. } => in_range(value, *min, *max),
        Constraint::Enumeration(tokens) => tokens.iter().any(|t| token_matches(t, value)),
    }
}

fn in_range(value: &Value, min: f64, max: f64) -> bool {
    match value {
        Value::Array(items) => items.iter().all(|item| in_range(item, min, max)),
        other => other.as_f64().map(|n| n >= min && n <= max).unwrap_or(false),
    }
}

fn token_matches(token: &Token, value: &Value) -> bool {
    match (token, value) {
        (Token::None, Value::Null) => true,
        (Token::Text(text), Value::String(s)) => s == text,
        _ => false,
    }
}

/// Produce a uniformly random value that `validate` accepts for the same
/// attribute: a random integer or real for ranges, a coin flip for booleans,
/// a uniformly chosen token for enumerations.
pub fn random_value(attr: &str) -> Result<Value, HueError> {
    let mut rng = rand::rng();
    Ok(match constraint(attr)? {
        Constraint::Bool => Value::Bool(rng.random()),
        Constraint::Range { min, max, kind: NumericKind::Integer } => {
            json!(rng.random_range(*min as i64..=*max as i64))
        }
        Constraint::Range { min, max, kind: NumericKind::Real } => {
            json!(rng.random_range(*min..=*max))
        }
        Constraint::Enumeration(tokens) => match tokens.choose(&mut rng) {
            Some(Token::Text(text)) => Value::String((*text).to_string()),
            Some(Token::None) | None => Value::Null,
        },
    })
}
