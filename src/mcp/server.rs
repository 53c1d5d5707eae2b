//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! Exposes the search service as MCP tools over stdio or streamable HTTP.

use crate::mcp::tools::{Tool, ToolRegistry};
use crate::query::SearchService;
use async_trait::async_trait;
use pmcp::{
    server::streamable_http_server::StreamableHttpServer,
    Error, RequestHandlerExtra, Server, ServerCapabilities, ToolHandler, ToolInfo,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// The MCP server for the abstract mirror
#[derive(Debug, Clone)]
pub struct McpServer {
    server: Arc<Mutex<Server>>,
}

impl McpServer {
    /// Create a new MCP server over the given search service
    pub fn new(service: Arc<SearchService>) -> Result<Self, pmcp::Error> {
        let tools = ToolRegistry::from_service(service);
        let server = Self::build_server_impl(tools)?;
        Ok(Self {
            server: Arc::new(Mutex::new(server)),
        })
    }

    fn build_server_impl(tools: ToolRegistry) -> Result<Server, pmcp::Error> {
        let mut builder = Server::builder()
            .name("arxiv-search")
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for tool in tools.all() {
            tracing::debug!("Registering MCP tool '{}'", tool.name);
            builder = builder.tool(tool.name.clone(), ToolAdapter::from(tool));
        }

        builder.build()
    }

    /// Run the server in stdio mode until the client disconnects
    pub async fn run(self) -> Result<(), pmcp::Error> {
        tracing::info!("Starting MCP server in stdio mode");

        // run_stdio() takes ownership of the Server
        let server = Arc::try_unwrap(self.server)
            .map_err(|_| Error::internal("MCP server handle is still shared"))?
            .into_inner();

        server.run_stdio().await
    }

    /// Run the server over streamable HTTP on `addr`
    pub async fn run_http(&self, addr: &str) -> Result<(SocketAddr, JoinHandle<()>), pmcp::Error> {
        tracing::info!("Starting MCP server in HTTP mode on {}", addr);

        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::invalid_params(format!("Invalid address: {}", e)))?;

        let http_server = StreamableHttpServer::new(socket_addr, self.server.clone());

        http_server.start().await
    }
}

/// Adapts a registry [`Tool`] to pmcp's `ToolHandler`
#[derive(Clone)]
struct ToolAdapter {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: Arc<dyn crate::mcp::tools::ToolHandler>,
}

impl From<&Tool> for ToolAdapter {
    fn from(tool: &Tool) -> Self {
        Self {
            name: tool.name.clone(),
            description: Some(tool.description.clone()),
            input_schema: tool.input_schema.clone(),
            handler: tool.handler.clone(),
        }
    }
}

#[async_trait]
impl ToolHandler for ToolAdapter {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        self.handler
            .execute(args)
            .await
            .map_err(|e| {
                tracing::debug!("Tool '{}' failed: {}", self.name, e);
                Error::internal(&e)
            })
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::utils::TextAnalyzer;

    fn service() -> Arc<SearchService> {
        let store = MemoryStore::new(Arc::new(TextAnalyzer::without_stop_words()));
        Arc::new(SearchService::new(Arc::new(store)))
    }

    #[test]
    fn test_server_builds() {
        assert!(McpServer::new(service()).is_ok());
    }

    #[test]
    fn test_adapter_metadata() {
        let registry = ToolRegistry::from_service(service());
        let tool = registry.get("search_abstracts").unwrap();
        let adapter = ToolAdapter::from(tool);
        assert_eq!(adapter.name, "search_abstracts");
        assert!(adapter.metadata().is_some());
    }

    #[tokio::test]
    async fn test_run_http_rejects_bad_address() {
        let server = McpServer::new(service()).unwrap();
        assert!(server.run_http("not-an-address").await.is_err());
    }
}
