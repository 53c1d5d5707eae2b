//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::handlers::{
    CompleteAuthorsHandler, CompleteCategoriesHandler, GetAbstractHandler, SearchAbstractsHandler,
};
use crate::query::SearchService;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "search_abstracts")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: serde_json::Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry exposing the search service
    pub fn from_service(service: Arc<SearchService>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };
        registry.register_search_tools(&service);
        registry
    }

    fn register_search_tools(&mut self, service: &Arc<SearchService>) {
        let limits = *service.limits();

        self.register(Tool {
            name: "search_abstracts".to_string(),
            description: format!(
                "Search mirrored arXiv abstracts on the {} store. Free text is matched against \
                 title and abstract; restrict with author:, category:, from: and to: \
                 (synonyms au:, cat:, since:, until:). Quote values containing spaces, \
                 e.g. author:\"hogg, david\".",
                service.store().name()
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Query, e.g. 'emcee mcmc cat:astro-ph.IM since:2010 au:hogg'"
                    },
                    "page": {
                        "type": "integer",
                        "description": "Page number, starting at 1",
                        "default": 1
                    },
                    "per_page": {
                        "type": "integer",
                        "description": format!(
                            "Results per page ({} to {})",
                            limits.min_per_page, limits.max_per_page
                        ),
                        "default": limits.default_per_page
                    }
                },
                "required": ["query"]
            }),
            handler: Arc::new(SearchAbstractsHandler {
                service: service.clone(),
            }),
        });

        self.register(Tool {
            name: "get_abstract".to_string(),
            description: "Get the full abstract and metadata for one arXiv id.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "arxiv_id": {
                        "type": "string",
                        "description": "arXiv identifier (e.g., '1202.3665', 'arXiv:1202.3665v2', 'hep-th/9901001')"
                    }
                },
                "required": ["arxiv_id"]
            }),
            handler: Arc::new(GetAbstractHandler {
                service: service.clone(),
            }),
        });

        self.register(Tool {
            name: "complete_authors".to_string(),
            description: "Suggest stored author names for a partially typed name.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "prefix": {
                        "type": "string",
                        "description": "Partial name, 'Last, First' or 'First Last'"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum suggestions"
                    }
                },
                "required": ["prefix"]
            }),
            handler: Arc::new(CompleteAuthorsHandler {
                service: service.clone(),
            }),
        });

        self.register(Tool {
            name: "complete_categories".to_string(),
            description: "Suggest arXiv categories starting with a prefix.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "prefix": {
                        "type": "string",
                        "description": "Category prefix (e.g., 'astro-ph', 'hep')"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum suggestions"
                    }
                },
                "required": ["prefix"]
            }),
            handler: Arc::new(CompleteCategoriesHandler {
                service: service.clone(),
            }),
        });
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools, sorted by name
    pub fn all(&self) -> Vec<&Tool> {
        let mut tools: Vec<&Tool> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, String> {
        let tool = self
            .get(name)
            .ok_or_else(|| format!("Tool '{}' not found", name))?;

        tool.handler.execute(args).await
    }
}
