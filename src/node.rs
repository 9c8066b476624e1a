use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ExtractError, Result};

/// ESTree kind names produced by the parser adapter.
pub mod kinds {
    pub const PROGRAM: &str = "Program";
    pub const LITERAL: &str = "Literal";
    pub const IDENTIFIER: &str = "Identifier";
    pub const CALL: &str = "CallExpression";
    pub const NEW: &str = "NewExpression";
    pub const MEMBER: &str = "MemberExpression";
    pub const OBJECT: &str = "ObjectExpression";
    pub const PROPERTY: &str = "Property";
    pub const ARRAY: &str = "ArrayExpression";
    pub const ASSIGNMENT: &str = "AssignmentExpression";
    pub const BINARY: &str = "BinaryExpression";
    pub const LOGICAL: &str = "LogicalExpression";
    pub const FUNCTION: &str = "FunctionExpression";
    pub const ARROW_FUNCTION: &str = "ArrowFunctionExpression";
    pub const VARIABLE_DECLARATION: &str = "VariableDeclaration";
    pub const VARIABLE_DECLARATOR: &str = "VariableDeclarator";
    pub const RETURN: &str = "ReturnStatement";
    pub const BLOCK: &str = "BlockStatement";
}

/// Source position of a node. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Opaque leaf value carried by a node field.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Str(s) => !s.is_empty(),
            Scalar::Num(n) => *n != 0.0 && !n.is_nan(),
            Scalar::Bool(b) => *b,
            Scalar::Null => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Num(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Scalar::Num(n) => f.write_str(&number_to_string(*n)),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Null => f.write_str("null"),
        }
    }
}

/// `Number.prototype.toString()` for finite and non-finite numbers:
/// plain notation for decimal exponents in `-7..21`, exponential otherwise.
fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n == 0.0 {
        return "0".into();
    }
    let sign = if n < 0.0 { "-" } else { "" };
    // shortest round-trip digits, e.g. `1.2345e3`
    let scientific = format!("{:e}", n.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits = mantissa.replace('.', "");
    let k = digits.len() as i32;
    let point = exponent.parse::<i32>().unwrap_or(0) + 1;

    let body = if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let (first, rest) = digits.split_at(1);
        let exp = point - 1;
        format!(
            "{}{}{}e{}{}",
            first,
            if rest.is_empty() { "" } else { "." },
            rest,
            if exp < 0 { "-" } else { "+" },
            exp.abs()
        )
    };
    format!("{}{}", sign, body)
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scalar::Str(s) => serializer.serialize_str(s),
            Scalar::Num(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Scalar::Num(n) => serializer.serialize_f64(*n),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Null => serializer.serialize_unit(),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Num(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Content of a single node field.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Node(Box<Node>),
    Nodes(Vec<Node>),
    Scalar(Scalar),
}

impl Child {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Child::Node(node) => Some(node.as_ref()),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[Node]> {
        match self {
            Child::Nodes(nodes) => Some(nodes.as_slice()),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Child::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(Box::new(node))
    }
}

impl From<Vec<Node>> for Child {
    fn from(nodes: Vec<Node>) -> Self {
        Child::Nodes(nodes)
    }
}

impl From<Option<Node>> for Child {
    fn from(node: Option<Node>) -> Self {
        node.map(Child::from).unwrap_or(Child::Scalar(Scalar::Null))
    }
}

impl From<Scalar> for Child {
    fn from(scalar: Scalar) -> Self {
        Child::Scalar(scalar)
    }
}

macro_rules! scalar_child {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Child {
            fn from(value: $ty) -> Self {
                Child::Scalar(Scalar::from(value))
            }
        })*
    };
}

scalar_child!(&str, String, f64, bool);

impl Serialize for Child {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Child::Node(node) => node.serialize(serializer),
            Child::Nodes(nodes) => nodes.serialize(serializer),
            Child::Scalar(scalar) => scalar.serialize(serializer),
        }
    }
}

/// One syntax tree element: a kind tag, a location and named fields in
/// the order the parser produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: String,
    loc: Location,
    fields: Vec<(String, Child)>,
}

impl Node {
    pub fn new(kind: impl Into<String>, loc: Location) -> Self {
        Node { kind: kind.into(), loc, fields: Vec::new() }
    }

    /// Builder-style field insertion. A repeated name replaces the earlier value.
    pub fn with(mut self, name: &str, child: impl Into<Child>) -> Self {
        let child = child.into();
        match self.fields.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = child,
            None => self.fields.push((name.to_string(), child)),
        }
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn loc(&self) -> Location {
        self.loc
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Child)> {
        self.fields.iter().map(|(name, child)| (name.as_str(), child))
    }

    pub fn get(&self, name: &str) -> Option<&Child> {
        self.fields.iter().find(|(key, _)| key == name).map(|(_, child)| child)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.get(name).and_then(Child::as_node)
    }

    /// Array field contents; absent or non-array fields read as empty.
    pub fn nodes(&self, name: &str) -> &[Node] {
        self.get(name).and_then(Child::as_nodes).unwrap_or(&[])
    }

    pub fn scalar(&self, name: &str) -> Option<&Scalar> {
        self.get(name).and_then(Child::as_scalar)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.scalar(name).and_then(Scalar::as_str)
    }

    /// Name of an `Identifier` node.
    pub fn identifier_name(&self) -> Option<&str> {
        if self.is(kinds::IDENTIFIER) {
            self.str_field("name")
        } else {
            None
        }
    }

    /// Build a tree from ESTree JSON, as produced by acorn with
    /// `locations: true`.
    pub fn from_estree(value: &serde_json::Value) -> Result<Node> {
        let object = value.as_object().ok_or_else(|| ExtractError::InvalidTree {
            message: format!("expected a node object, found {}", json_type(value)),
        })?;
        let kind = object.get("type").and_then(|t| t.as_str()).ok_or_else(|| {
            ExtractError::InvalidTree { message: "node object without a \"type\"".into() }
        })?;
        let loc = object
            .get("loc")
            .and_then(|loc| loc.get("start"))
            .map(|start| Location {
                line: start.get("line").and_then(|l| l.as_u64()).unwrap_or(0) as usize,
                column: start.get("column").and_then(|c| c.as_u64()).unwrap_or(0) as usize,
            })
            .unwrap_or_default();

        let mut node = Node::new(kind, loc);
        for (name, field) in object {
            if matches!(name.as_str(), "type" | "loc" | "start" | "end" | "range") {
                continue;
            }
            if let Some(child) = estree_child(field)? {
                node = node.with(name, child);
            }
        }

        // acorn reports regex literals as an empty object value plus a
        // `regex` descriptor
        if node.is(kinds::LITERAL) && node.get("value").is_none() {
            if let Some(regex) = object.get("regex") {
                let pattern = regex.get("pattern").and_then(|p| p.as_str()).unwrap_or("");
                let flags = regex.get("flags").and_then(|f| f.as_str()).unwrap_or("");
                node = node.with("value", format!("/{}/{}", pattern, flags));
            }
        }

        Ok(node)
    }
}

fn estree_child(value: &serde_json::Value) -> Result<Option<Child>> {
    use serde_json::Value as Json;
    Ok(match value {
        Json::Null => Some(Child::Scalar(Scalar::Null)),
        Json::Bool(b) => Some(Child::Scalar(Scalar::Bool(*b))),
        Json::Number(n) => n.as_f64().map(|n| Child::Scalar(Scalar::Num(n))),
        Json::String(s) => Some(Child::Scalar(Scalar::Str(s.clone()))),
        Json::Object(object) if object.contains_key("type") => {
            Some(Child::from(Node::from_estree(value)?))
        }
        Json::Object(_) => None,
        Json::Array(items) => {
            let mut nodes = Vec::with_capacity(items.len());
            for item in items {
                // holes and non-node entries carry nothing searchable
                if item.get("type").is_some() {
                    nodes.push(Node::from_estree(item)?);
                }
            }
            Some(Child::Nodes(nodes))
        }
    })
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        map.serialize_entry("type", &self.kind)?;
        map.serialize_entry("loc", &self.loc)?;
        for (name, child) in &self.fields {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_estree_keeps_fields_and_location() {
        let tree = json!({
            "type": "MemberExpression",
            "start": 0,
            "end": 14,
            "loc": { "start": { "line": 3, "column": 4 }, "end": { "line": 3, "column": 18 } },
            "object": { "type": "Identifier", "name": "module" },
            "property": { "type": "Identifier", "name": "exports" },
            "computed": false
        });
        let node = Node::from_estree(&tree).unwrap();
        assert_eq!(node.kind(), "MemberExpression");
        assert_eq!(node.loc(), Location { line: 3, column: 4 });
        assert_eq!(node.node("object").and_then(Node::identifier_name), Some("module"));
        assert_eq!(node.scalar("computed"), Some(&Scalar::Bool(false)));
        assert!(node.get("start").is_none());
    }

    #[test]
    fn test_from_estree_skips_array_holes() {
        let tree = json!({
            "type": "ArrayExpression",
            "elements": [null, { "type": "Literal", "value": 1 }]
        });
        let node = Node::from_estree(&tree).unwrap();
        assert_eq!(node.nodes("elements").len(), 1);
    }

    #[test]
    fn test_from_estree_regex_literal() {
        let tree = json!({
            "type": "Literal",
            "value": {},
            "raw": "/^a+$/i",
            "regex": { "pattern": "^a+$", "flags": "i" }
        });
        let node = Node::from_estree(&tree).unwrap();
        assert_eq!(node.str_field("value"), Some("/^a+$/i"));
    }

    #[test]
    fn test_from_estree_rejects_untyped_root() {
        let err = Node::from_estree(&json!({ "name": "x" })).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidTree { .. }));
    }

    #[test]
    fn test_scalar_display_and_truthiness() {
        assert_eq!(Scalar::Num(101.0).to_string(), "101");
        assert_eq!(Scalar::Num(1.5).to_string(), "1.5");
        assert_eq!(Scalar::Num(-0.25).to_string(), "-0.25");
        assert_eq!(Scalar::Null.to_string(), "null");
        assert!(!Scalar::Num(0.0).is_truthy());
        assert!(!Scalar::Str(String::new()).is_truthy());
        assert!(Scalar::Str("x".into()).is_truthy());
    }

    #[test]
    fn test_scalar_display_uses_exponent_outside_plain_range() {
        assert_eq!(Scalar::Num(1e21).to_string(), "1e+21");
        assert_eq!(Scalar::Num(1e20).to_string(), "100000000000000000000");
        assert_eq!(Scalar::Num(1.5e-7).to_string(), "1.5e-7");
        assert_eq!(Scalar::Num(0.000001).to_string(), "0.000001");
        assert_eq!(Scalar::Num(123.456).to_string(), "123.456");
        assert_eq!(Scalar::Num(-2.5e22).to_string(), "-2.5e+22");
        assert_eq!(Scalar::Num(f64::NAN).to_string(), "NaN");
        assert_eq!(Scalar::Num(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn test_serialize_round_trips_shape() {
        let node = Node::new(kinds::LITERAL, Location { line: 1, column: 0 }).with("value", 400.0);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json, json!({ "type": "Literal", "loc": { "line": 1, "column": 0 }, "value": 400 }));
    }
}
