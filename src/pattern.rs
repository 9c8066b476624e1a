//! Structural queries over the node model.
//!
//! A [`Pattern`] is a partial node: every constraint it carries must hold
//! for a candidate, and anything it leaves out is a wildcard. Patterns nest,
//! so deep shapes such as `module.exports = <fn>` are written as patterns
//! whose fields are themselves patterns.

use crate::node::{Child, Node, Scalar};

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Matches a scalar field of equal value and type.
    Scalar(Scalar),
    /// Matches a node satisfying an optional kind and every constraint.
    Shape(Shape),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    kind: Option<String>,
    constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq)]
enum Constraint {
    /// The named field exists and matches.
    Field(String, Pattern),
    /// At least one field, or one element of an array field, matches.
    SomeField(Pattern),
}

impl Pattern {
    /// Shape pattern with no constraints; matches every node.
    pub fn any() -> Self {
        Pattern::Shape(Shape::default())
    }

    pub fn node(kind: &str) -> Self {
        Pattern::Shape(Shape { kind: Some(kind.to_string()), constraints: Vec::new() })
    }

    /// Constrain a named field. No-op on scalar patterns.
    pub fn field(self, name: &str, pattern: impl Into<Pattern>) -> Self {
        self.constrain(Constraint::Field(name.to_string(), pattern.into()))
    }

    /// Require some field of the candidate, whatever its name, to match.
    pub fn some_field(self, pattern: impl Into<Pattern>) -> Self {
        self.constrain(Constraint::SomeField(pattern.into()))
    }

    fn constrain(self, constraint: Constraint) -> Self {
        match self {
            Pattern::Shape(mut shape) => {
                shape.constraints.push(constraint);
                Pattern::Shape(shape)
            }
            scalar => scalar,
        }
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern::Scalar(Scalar::from(s))
    }
}

impl From<f64> for Pattern {
    fn from(n: f64) -> Self {
        Pattern::Scalar(Scalar::Num(n))
    }
}

impl From<bool> for Pattern {
    fn from(b: bool) -> Self {
        Pattern::Scalar(Scalar::Bool(b))
    }
}

impl From<Scalar> for Pattern {
    fn from(scalar: Scalar) -> Self {
        Pattern::Scalar(scalar)
    }
}

/// Whether `node` satisfies `pattern`. A node never equals a scalar pattern.
pub fn matches(node: &Node, pattern: &Pattern) -> bool {
    let shape = match pattern {
        Pattern::Scalar(_) => return false,
        Pattern::Shape(shape) => shape,
    };

    if let Some(kind) = &shape.kind {
        if !node.is(kind) {
            return false;
        }
    }

    shape.constraints.iter().all(|constraint| match constraint {
        Constraint::Field(name, pattern) => {
            node.get(name).is_some_and(|child| matches_child(child, pattern))
        }
        Constraint::SomeField(pattern) => node.fields().any(|(_, child)| match child {
            Child::Nodes(nodes) => nodes.iter().any(|n| matches(n, pattern)),
            _ => matches_child(child, pattern),
        }),
    })
}

/// Match a field value. Arrays are not field-bearing, so only a node can
/// satisfy a shape pattern.
pub fn matches_child(child: &Child, pattern: &Pattern) -> bool {
    match (child, pattern) {
        (Child::Scalar(value), Pattern::Scalar(expected)) => value == expected,
        (Child::Node(node), Pattern::Shape(_)) => matches(node, pattern),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Test the target itself.
    Single,
    /// Test each element of a sequence without descending into nodes.
    Array,
    /// Test the target, and descend into every field of non-matching nodes.
    Recursive,
}

/// Anything `find` can search.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Node(&'a Node),
    Nodes(&'a [Node]),
    Child(&'a Child),
}

impl<'a> From<&'a Node> for Target<'a> {
    fn from(node: &'a Node) -> Self {
        Target::Node(node)
    }
}

impl<'a> From<&'a [Node]> for Target<'a> {
    fn from(nodes: &'a [Node]) -> Self {
        Target::Nodes(nodes)
    }
}

impl<'a> From<&'a Vec<Node>> for Target<'a> {
    fn from(nodes: &'a Vec<Node>) -> Self {
        Target::Nodes(nodes)
    }
}

impl<'a> From<&'a Child> for Target<'a> {
    fn from(child: &'a Child) -> Self {
        Target::Child(child)
    }
}

/// Collect the nodes matching `pattern`. Results follow field order, then
/// element order; a matching node is returned without searching inside it.
pub fn find<'a>(target: impl Into<Target<'a>>, pattern: &Pattern, mode: Mode) -> Vec<&'a Node> {
    let mut found = Vec::new();
    collect(target.into(), pattern, mode, &mut found);
    found
}

fn collect<'a>(target: Target<'a>, pattern: &Pattern, mode: Mode, found: &mut Vec<&'a Node>) {
    match target {
        Target::Node(node) => {
            if matches(node, pattern) {
                found.push(node);
            } else if mode == Mode::Recursive {
                for (_, child) in node.fields() {
                    collect(Target::Child(child), pattern, mode, found);
                }
            }
        }
        Target::Nodes(nodes) => {
            if mode == Mode::Single {
                return;
            }
            for node in nodes {
                collect(Target::Node(node), pattern, mode, found);
            }
        }
        Target::Child(Child::Node(node)) => collect(Target::Node(node), pattern, mode, found),
        Target::Child(Child::Nodes(nodes)) => collect(Target::Nodes(nodes), pattern, mode, found),
        Target::Child(Child::Scalar(_)) => {}
    }
}
