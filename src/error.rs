use std::path::PathBuf;
use thiserror::Error;

use crate::node::Node;

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;

/// Fatal extraction failures. Values the evaluator cannot resolve are not
/// errors and never show up here.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A required construct is absent, duplicated or of the wrong kind.
    #[error("{}", located(.path, .line, .message))]
    Shape { path: String, line: Option<usize>, message: String },

    #[error("{}", located(.path, .line, &missing_property(.field)))]
    MissingField { path: String, line: Option<usize>, field: String },

    #[error("{}", located(.path, .line, .message))]
    Parse { path: String, line: Option<usize>, message: String },

    #[error("invalid syntax tree: {message}")]
    InvalidTree { message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("failed to read \"{}\"", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    pub fn shape(path: &str, message: impl Into<String>) -> Self {
        ExtractError::Shape { path: path.to_string(), line: None, message: message.into() }
    }

    /// Shape violation reported at the line of `node`.
    pub fn shape_at(path: &str, node: &Node, message: impl Into<String>) -> Self {
        ExtractError::Shape {
            path: path.to_string(),
            line: line_of(node),
            message: message.into(),
        }
    }

    pub fn missing_field(path: &str, node: &Node, field: &str) -> Self {
        ExtractError::MissingField {
            path: path.to_string(),
            line: line_of(node),
            field: field.to_string(),
        }
    }
}

fn line_of(node: &Node) -> Option<usize> {
    Some(node.loc().line).filter(|line| *line > 0)
}

fn missing_property(field: &str) -> String {
    format!("Missing required property \"{}\"", field)
}

fn located(path: &str, line: &Option<usize>, message: &str) -> String {
    if path.is_empty() {
        return message.to_string();
    }
    let mut out = format!("Error parsing \"{}\"", path);
    if let Some(line) = line {
        out.push_str(&format!(" at line {}", line));
    }
    out.push_str(":\n");
    out.push_str(message);
    out
}
