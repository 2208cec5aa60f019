//! Token substitution for blueprint templates.
//!
//! Templates are walked as JSON trees. Every string (object keys included) is
//! scanned once for `$identifier$` tokens:
//!
//! - `$replace_with_input_entity$` / `$replace_with_input_name$` come from the
//!   [`TemplateContext`]
//! - any other identifier is looked up in the inputs; a missing input echoes
//!   its own name so an unconfigured blueprint still renders
//!
//! After substitution a string value that reads exactly `true` or `false`
//! becomes a JSON boolean. Substituted text is never scanned again, so a
//! `$token$` inside an input value is inserted literally.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::constants::tokens;
use crate::error::{EngineError, Result};

/// Values for the reserved tokens
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub input_entity: &'a str,
    pub input_name: &'a str,
}

pub fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_reserved(identifier: &str) -> bool {
    identifier == tokens::INPUT_ENTITY || identifier == tokens::INPUT_NAME
}

/// Render an already-parsed template
pub fn render(template: &Value, inputs: &Map<String, Value>, context: &TemplateContext) -> Value {
    match template {
        Value::String(text) => coerce(substitute(text, inputs, context)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render(v, inputs, context)).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| (substitute(key, inputs, context), render(value, inputs, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Parse template text, then render it. A parse failure only affects `target`.
pub fn render_text(
    text: &str,
    inputs: &Map<String, Value>,
    context: &TemplateContext,
    target: &str,
) -> Result<Value> {
    let template: Value = serde_json::from_str(text).map_err(|e| EngineError::TemplateParse {
        target: target.to_string(),
        reason: e.to_string(),
    })?;
    Ok(render(&template, inputs, context))
}

/// Render a stored template; a top-level JSON string holds template text
pub fn render_stored(
    template: &Value,
    inputs: &Map<String, Value>,
    context: &TemplateContext,
    target: &str,
) -> Result<Value> {
    match template {
        Value::String(text) => render_text(text, inputs, context, target),
        other => Ok(render(other, inputs, context)),
    }
}

/// Every token identifier used anywhere in the template
pub fn referenced_tokens(template: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect_tokens(template, &mut found);
    found
}

fn collect_tokens(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::String(text) => scan(text, |segment| {
            if let Segment::Token(name) = segment {
                found.insert(name.to_string());
            }
        }),
        Value::Array(items) => items.iter().for_each(|v| collect_tokens(v, found)),
        Value::Object(fields) => {
            for (key, value) in fields {
                collect_tokens(&Value::String(key.clone()), found);
                collect_tokens(value, found);
            }
        }
        _ => (),
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Token(&'a str),
}

/// Split `text` into literal runs and `$identifier$` tokens.
/// A `$` that does not open a valid token is literal.
fn scan<'a>(text: &'a str, mut emit: impl FnMut(Segment<'a>)) {
    let mut rest = text;
    while let Some(start) = rest.find(tokens::DELIMITER) {
        let after = &rest[start + 1..];
        match after.find(tokens::DELIMITER) {
            Some(end) if is_identifier(&after[..end]) => {
                if start > 0 {
                    emit(Segment::Literal(&rest[..start]));
                }
                emit(Segment::Token(&after[..end]));
                rest = &after[end + 1..];
            }
            _ => {
                emit(Segment::Literal(&rest[..start + 1]));
                rest = after;
            }
        }
    }
    if !rest.is_empty() {
        emit(Segment::Literal(rest));
    }
}

fn substitute(text: &str, inputs: &Map<String, Value>, context: &TemplateContext) -> String {
    let mut out = String::with_capacity(text.len());
    scan(text, |segment| match segment {
        Segment::Literal(literal) => out.push_str(literal),
        Segment::Token(name) => out.push_str(&resolve_token(name, inputs, context)),
    });
    out
}

fn resolve_token(name: &str, inputs: &Map<String, Value>, context: &TemplateContext) -> String {
    match name {
        tokens::INPUT_ENTITY => context.input_entity.to_string(),
        tokens::INPUT_NAME => context.input_name.to_string(),
        _ => match inputs.get(name) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => name.to_string(),
        },
    }
}

fn coerce(text: String) -> Value {
    match text.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(text),
    }
}
