use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::analyzer::exports::extract_exports;
use crate::analyzer::extract::{load_module, parse_module_source, read_source, Extractor};
use crate::cache::IncrementalCache;
use crate::error::{ExtractError, Result};
use crate::eval::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteModule {
    pub name: String,
    pub slug: String,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub method: String,
    pub path: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
    pub has_query_parameters: bool,
    pub query_parameters: Vec<Parameter>,
    pub has_request_body: bool,
    pub request_body: Vec<Parameter>,
    pub has_response_body: bool,
    pub response_body: Vec<Parameter>,
}

impl Route {
    pub fn new(
        method: String,
        path: String,
        authentication: Option<Authentication>,
        query_parameters: Vec<Parameter>,
        request_body: Vec<Parameter>,
        response_body: Vec<Parameter>,
    ) -> Self {
        Route {
            slug: slug(&format!("{} {}", method, path)),
            method,
            path,
            authentication,
            has_query_parameters: !query_parameters.is_empty(),
            query_parameters,
            has_request_body: !request_body.is_empty(),
            request_body,
            has_response_body: !response_body.is_empty(),
            response_body,
        }
    }
}

/// Placeholder the document template shows until a parameter is described.
pub const DESCRIPTION_PLACEHOLDER: &str = "TODO: description goes here";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    /// Rendered validation expression, when one could be resolved.
    pub validation: Option<String>,
}

impl Parameter {
    pub fn new(name: String, validation: Option<String>) -> Self {
        Parameter { name, description: DESCRIPTION_PLACEHOLDER.to_string(), validation }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authentication {
    pub emojis: String,
    pub token: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub code: Value,
    pub errno: Value,
    pub definition: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalErrorParams {
    pub errno: Value,
    pub has_params: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorTable {
    pub errors: Vec<ErrorRecord>,
    pub additional_error_params: Vec<AdditionalErrorParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportEntry {
    pub key: String,
    pub value: String,
}

/// Everything the API document is rendered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDocs {
    pub modules: Vec<RouteModule>,
    pub validators: Vec<ExportEntry>,
    pub metrics_context: Vec<ExportEntry>,
    pub errors: Vec<ErrorRecord>,
    pub additional_error_params: Vec<AdditionalErrorParams>,
}

/// Source locations for [`Extractor::generate`].
#[derive(Debug, Clone)]
pub struct DocInputs {
    pub routes_dir: PathBuf,
    pub validators: PathBuf,
    pub metrics_context: PathBuf,
    pub errors: PathBuf,
}

/// Module display name: the file stem with a leading lowercase letter
/// capitalised.
pub fn module_name(path: &Path) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => first.to_ascii_uppercase().to_string() + chars.as_str(),
        _ => stem,
    }
}

/// Anchor-safe identifier: lowercase, whitespace to `-`, and nothing
/// outside `[a-z0-9_-]`.
pub fn slug(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

/// Route modules directly inside `dir`, sorted by file name.
pub fn find_route_files(dir: &Path, extractor: &Extractor) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| ExtractError::Io {
            path: err.path().unwrap_or(dir).to_path_buf(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if file_name.ends_with(".js") && !extractor.config().ignore.contains(&*file_name) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

impl Extractor {
    /// Extract every route module in `dir`, in parallel, optionally reusing
    /// cached results for unchanged files.
    pub fn index_routes(&self, dir: &Path, cache: Option<&IncrementalCache<RouteModule>>) -> Result<Vec<RouteModule>> {
        let files = find_route_files(dir, self)?;
        debug!(dir = %dir.display(), files = files.len(), "indexing route modules");

        let modules = files
            .par_iter()
            .map(|file| -> Result<RouteModule> {
                let source = read_source(file)?;
                let key = file.display().to_string();
                if let Some(cached) = cache.and_then(|cache| cache.get(&key, &source)) {
                    debug!(file = %key, "route module cache hit");
                    return Ok(cached);
                }
                let program = parse_module_source(&source, file)?;
                let module = self.extract_routes(&program, file)?;
                if let Some(cache) = cache {
                    cache.set(&key, &source, module.clone());
                }
                Ok(module)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(modules = modules.len(), routes = modules.iter().map(|m| m.routes.len()).sum::<usize>(), "indexed routes");
        Ok(modules)
    }

    pub fn exports_from_file(&self, path: &Path) -> Result<Vec<ExportEntry>> {
        let program = load_module(path)?;
        let exports = extract_exports(&program);
        debug!(file = %path.display(), exports = exports.len(), "extracted module exports");
        Ok(exports)
    }

    pub fn errors_from_file(&self, path: &Path) -> Result<ErrorTable> {
        let program = load_module(path)?;
        self.extract_errors(&program, path)
    }

    /// Assemble the full document data. The four sources are independent
    /// and are processed concurrently; the first failure aborts the run.
    pub fn generate(&self, inputs: &DocInputs, cache: Option<&IncrementalCache<RouteModule>>) -> Result<ApiDocs> {
        let (modules, (validators, (metrics_context, errors))) = rayon::join(
            || self.index_routes(&inputs.routes_dir, cache),
            || {
                rayon::join(
                    || self.exports_from_file(&inputs.validators),
                    || {
                        rayon::join(
                            || self.exports_from_file(&inputs.metrics_context),
                            || self.errors_from_file(&inputs.errors),
                        )
                    },
                )
            },
        );
        let errors = errors?;
        Ok(ApiDocs {
            modules: modules?,
            validators: validators?,
            metrics_context: metrics_context?,
            errors: errors.errors,
            additional_error_params: errors.additional_error_params,
        })
    }
}
