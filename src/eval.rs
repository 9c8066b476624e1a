//! Best-effort symbolic evaluation of expression nodes.
//!
//! Nothing is executed. Calls, member accesses and object literals are
//! rendered as readable text (`isA.string.max(32)`), identifiers are
//! substituted from an [`Environment`] when bound, and every other shape
//! degrades to [`Value::Unresolved`].

use serde::ser::Serializer;
use serde::Serialize;
use std::fmt;

use crate::env::{Environment, EMPTY};
use crate::node::{kinds, Node, Scalar};

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A literal carried through verbatim.
    Scalar(Scalar),
    /// A rendering of a composite or unresolved expression.
    Text(String),
    /// Nothing documentable.
    Unresolved,
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Scalar(scalar) => scalar.is_truthy(),
            Value::Text(text) => !text.is_empty(),
            Value::Unresolved => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Value::Unresolved)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Scalar(scalar) => scalar.as_f64(),
            _ => None,
        }
    }

    /// `self` when truthy, otherwise `fallback`.
    pub fn or_else(self, fallback: impl FnOnce() -> Value) -> Value {
        if self.is_truthy() {
            self
        } else {
            fallback()
        }
    }

    /// Text used when the value is one entry of a joined list, where
    /// unresolved and null entries contribute nothing.
    fn list_text(&self) -> String {
        match self {
            Value::Unresolved | Value::Scalar(Scalar::Null) => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(scalar) => fmt::Display::fmt(scalar, f),
            Value::Text(text) => f.write_str(text),
            Value::Unresolved => f.write_str("undefined"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Scalar(scalar) => scalar.serialize(serializer),
            Value::Text(text) => serializer.serialize_str(text),
            Value::Unresolved => serializer.serialize_none(),
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

/// Reduce `node` to a value under `env`. Never fails.
pub fn evaluate(node: &Node, env: &Environment) -> Value {
    match node.kind() {
        kinds::LITERAL => node.scalar("value").cloned().map(Value::Scalar).unwrap_or(Value::Unresolved),
        kinds::IDENTIFIER => match node.str_field("name") {
            Some(name) => env.resolve(name).cloned().unwrap_or_else(|| Value::Text(name.to_string())),
            None => Value::Unresolved,
        },
        kinds::CALL => evaluate_call(node, env),
        kinds::MEMBER => evaluate_member(node, env),
        kinds::OBJECT => evaluate_object(node, env),
        _ => Value::Unresolved,
    }
}

fn evaluate_optional(node: Option<&Node>, env: &Environment) -> Value {
    node.map(|node| evaluate(node, env)).unwrap_or(Value::Unresolved)
}

fn evaluate_call(node: &Node, env: &Environment) -> Value {
    // the callee is rendered by name, never substituted
    let mut text = evaluate_optional(node.node("callee"), &EMPTY).to_string();
    let arguments = node.nodes("arguments");
    if !arguments.is_empty() {
        let rendered: Vec<String> =
            arguments.iter().map(|argument| evaluate(argument, env).list_text()).collect();
        text.push('(');
        text.push_str(&rendered.join(", "));
        text.push(')');
    }
    Value::Text(text)
}

fn evaluate_member(node: &Node, env: &Environment) -> Value {
    let property = node.node("property");
    let unmapped = evaluate_optional(property, &EMPTY);
    let mapped = evaluate_optional(property, env);
    if mapped != unmapped {
        // a bound property name stands in for the whole namespaced access
        return mapped;
    }
    let object = evaluate_optional(node.node("object"), &EMPTY);
    Value::Text(format!("{}.{}", object, unmapped))
}

fn evaluate_object(node: &Node, env: &Environment) -> Value {
    let rendered: Vec<String> = node
        .nodes("properties")
        .iter()
        .filter_map(|property| {
            let key = property_key(property)?;
            let value = evaluate_optional(property.node("value"), env);
            Some(format!("{}: {}", key, value))
        })
        .collect();
    Value::Text(format!("{{ {} }}", rendered.join(", ")))
}

/// Key text of an object property: identifier names and literal keys are
/// taken verbatim. Spread elements have no key.
pub fn property_key(property: &Node) -> Option<String> {
    let key = property.node("key")?;
    key.identifier_name()
        .map(str::to_string)
        .or_else(|| key.scalar("value").map(Scalar::to_string))
}
