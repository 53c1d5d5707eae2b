//! Tool handlers backed by the search service.

use std::sync::Arc;

use serde_json::Value;

use super::tools::ToolHandler;
use crate::query::{SearchError, SearchService};
use crate::utils::validate_query;

fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("Missing '{}' parameter", name))
}

fn optional_i64(args: &Value, name: &str) -> Option<i64> {
    args.get(name).and_then(|v| v.as_i64())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Failed to serialize result: {}", e))
}

/// Handler for `search_abstracts`
#[derive(Debug)]
pub struct SearchAbstractsHandler {
    pub service: Arc<SearchService>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchAbstractsHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let raw = required_str(&args, "query")?;
        let query = validate_query(raw)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| SearchError::EmptyQuery.to_string())?;

        let page = self.service.page(
            optional_i64(&args, "page"),
            optional_i64(&args, "per_page"),
        );

        let response = self
            .service
            .search(query, &page)
            .await
            .map_err(|e| e.to_string())?;
        to_json(&response)
    }
}

/// Handler for `get_abstract`
#[derive(Debug)]
pub struct GetAbstractHandler {
    pub service: Arc<SearchService>,
}

#[async_trait::async_trait]
impl ToolHandler for GetAbstractHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let arxiv_id = required_str(&args, "arxiv_id")?;
        let detail = self
            .service
            .detail(arxiv_id)
            .await
            .map_err(|e| e.to_string())?;
        to_json(&detail)
    }
}

fn limit_arg(args: &Value) -> Option<usize> {
    optional_i64(args, "limit").map(|l| l.max(1) as usize)
}

/// Handler for `complete_authors`
#[derive(Debug)]
pub struct CompleteAuthorsHandler {
    pub service: Arc<SearchService>,
}

#[async_trait::async_trait]
impl ToolHandler for CompleteAuthorsHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let prefix = required_str(&args, "prefix")?;
        let authors = self
            .service
            .complete_authors(prefix, limit_arg(&args))
            .await
            .map_err(|e| e.to_string())?;
        Ok(serde_json::json!({
            "count": authors.len(),
            "authors": authors,
        }))
    }
}

/// Handler for `complete_categories`
#[derive(Debug)]
pub struct CompleteCategoriesHandler {
    pub service: Arc<SearchService>,
}

#[async_trait::async_trait]
impl ToolHandler for CompleteCategoriesHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let prefix = required_str(&args, "prefix")?;
        let categories = self
            .service
            .complete_categories(prefix, limit_arg(&args))
            .await
            .map_err(|e| e.to_string())?;
        Ok(serde_json::json!({
            "count": categories.len(),
            "categories": categories,
        }))
    }
}
