pub mod cache;
pub mod config;
pub mod env;
pub mod error;
pub mod eval;
pub mod node;
pub mod parser;
pub mod pattern;
pub mod analyzer {
    pub mod auth;
    pub mod errors;
    pub mod exports;
    pub mod extract;
    pub mod metadata;
    pub mod routes;
}

// Re-export selected API for consumers
pub use analyzer::extract::Extractor;
pub use analyzer::metadata::{ApiDocs, DocInputs, ErrorTable, ExportEntry, RouteModule};
pub use config::ExtractionConfig;
pub use env::{build_environment, Environment};
pub use error::{ExtractError, Result};
pub use eval::{evaluate, Value};
pub use node::{Node, Scalar};
pub use parser::parse_source;
pub use pattern::{find, matches, Mode, Pattern};
