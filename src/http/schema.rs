//! Machine-readable API description.
//!
//! Only routes registered as documented appear here; the metrics endpoint
//! and this document itself are left out.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::Method, Json};
use serde::Serialize;

use crate::config::ServiceConfig;

pub const SCHEMA_PATH: &str = "/openapi.json";

const OPENAPI_VERSION: &str = "3.1.0";

#[derive(Debug, Clone, Serialize)]
pub struct ApiSchema {
    openapi: &'static str,
    info: Info,
    paths: BTreeMap<String, BTreeMap<String, Operation>>,
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    title: String,
    version: String,
}

#[derive(Debug, Clone, Serialize)]
struct Operation {
    summary: String,
}

impl ApiSchema {
    pub fn new(service: &ServiceConfig) -> Self {
        Self {
            openapi: OPENAPI_VERSION,
            info: Info {
                title: service.name.clone(),
                version: service.version.clone(),
            },
            paths: BTreeMap::new(),
        }
    }

    /// Add `method path` to the document.
    pub fn document(&mut self, path: &str, method: &Method) {
        self.paths
            .entry(path.to_string())
            .or_default()
            .insert(
                method.as_str().to_ascii_lowercase(),
                Operation {
                    summary: summary_for(path),
                },
            );
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }
}

/// Human summary from the last literal path segment: `/health` → `Health`.
fn summary_for(path: &str) -> String {
    let segment = path
        .rsplit('/')
        .find(|s| !s.is_empty() && !s.starts_with('{'))
        .unwrap_or("root");

    segment
        .split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn serve_schema(State(schema): State<Arc<ApiSchema>>) -> Json<ApiSchema> {
    Json(schema.as_ref().clone())
}
