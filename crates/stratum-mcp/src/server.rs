//! MCP server core: routes JSON-RPC requests to the tool and resource handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use stratum_core::router::Router;
use tracing::{debug, info, warn};

use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListResourcesResult,
    ListToolsResult, ReadResourceRequest, ReadResourceResult, ResourceContent, ResourceDescription,
    ServerCapabilities, ServerInfo, ToolDescription,
};
use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
use crate::tools;

pub struct McpServer {
    router: Arc<Router>,
    initialized: bool,
    tool_call_count: AtomicU64,
}

impl McpServer {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            initialized: false,
            tool_call_count: AtomicU64::new(0),
        }
    }

    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("handling request: {}", request.method);

        if !self.initialized && request.method != "initialize" && request.method != "notifications/initialized" {
            warn!("rejecting '{}': server not initialized", request.method);
            return Some(JsonRpcResponse::error(request.id, JsonRpcError::server_not_initialized()));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "notifications/initialized" => return None,
            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.params).await,
            "resources/list" => self.handle_resources_list().await,
            "resources/read" => self.handle_resources_read(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!("unknown method: {}", method);
                Err(JsonRpcError::method_not_found())
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    async fn handle_initialize(&mut self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: InitializeRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))?,
            None => InitializeRequest::default(),
        };

        let negotiated_version = if request.protocol_version.as_str() < MCP_VERSION {
            info!("client requested older protocol version {}, using it", request.protocol_version);
            request.protocol_version.clone()
        } else {
            MCP_VERSION.to_string()
        };

        self.initialized = true;
        info!("session initialized with protocol version {}", negotiated_version);

        let result = InitializeResult {
            protocol_version: negotiated_version,
            server_info: ServerInfo {
                name: "stratum".to_string(),
                version: stratum_core::VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(std::iter::once(("listChanged".to_string(), serde_json::json!(false))).collect()),
                resources: Some(std::iter::once(("listChanged".to_string(), serde_json::json!(false))).collect()),
            },
            instructions: Some(
                "Stratum is a four-tier hierarchical memory store: session, project, global, \
                 and temporal. Use store_memory to write, search_memory or advanced_search to \
                 read, and the decay/relationship tools to keep the store healthy over time."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn handle_tools_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let tools = vec![
            ToolDescription {
                name: "store_memory".to_string(),
                description: "Store a memory. The Router classifies it into session, project, global, or temporal unless a tier is explicitly requested.".to_string(),
                input_schema: tools::memory::store_schema(),
            },
            ToolDescription {
                name: "search_memory".to_string(),
                description: "Lexical search across the tiers the Router suggests for this query.".to_string(),
                input_schema: tools::memory::search_schema(),
            },
            ToolDescription {
                name: "get_memory_stats".to_string(),
                description: "Per-tier item counts and capacity stats.".to_string(),
                input_schema: tools::memory::stats_schema(),
            },
            ToolDescription {
                name: "advanced_search".to_string(),
                description: "Cascading hybrid search: lexical fused with semantic, temporal recency, and relationship-graph signals.".to_string(),
                input_schema: tools::search::advanced_search_schema(),
            },
            ToolDescription {
                name: "semantic_search".to_string(),
                description: "Vector cosine similarity search, anchored on the Global tier's embedding index.".to_string(),
                input_schema: tools::search::semantic_search_schema(),
            },
            ToolDescription {
                name: "temporal_search".to_string(),
                description: "Search the Temporal tier by an explicit or relative (today/yesterday/last week/this month) time range.".to_string(),
                input_schema: tools::search::temporal_search_schema(),
            },
            ToolDescription {
                name: "build_knowledge_graph".to_string(),
                description: "Autolinks live memories into the relationship graph from temporal, semantic, and shared-context signals.".to_string(),
                input_schema: tools::graph::build_graph_schema(),
            },
            ToolDescription {
                name: "get_memory_relationships".to_string(),
                description: "Confirmed relationships touching a memory.".to_string(),
                input_schema: tools::graph::relationships_schema(),
            },
            ToolDescription {
                name: "detect_conflicts".to_string(),
                description: "Finds pairs of memories whose content contradicts.".to_string(),
                input_schema: tools::graph::detect_conflicts_schema(),
            },
            ToolDescription {
                name: "get_memory_versions".to_string(),
                description: "Append-only version history for a memory.".to_string(),
                input_schema: tools::versions::schema(),
            },
            ToolDescription {
                name: "summarize_cluster".to_string(),
                description: "Deterministic summary (top tags, categories, representative snippet) over a set of memories.".to_string(),
                input_schema: tools::cluster::schema(),
            },
            ToolDescription {
                name: "get_relationship_suggestions".to_string(),
                description: "Relationship candidates below the auto-confirm confidence threshold, pending validation.".to_string(),
                input_schema: tools::validation::suggestions_schema(),
            },
            ToolDescription {
                name: "validate_relationship".to_string(),
                description: "Confirms, rejects, or modifies a pending relationship suggestion.".to_string(),
                input_schema: tools::validation::validate_schema(),
            },
            ToolDescription {
                name: "get_validation_stats".to_string(),
                description: "Pending/confirmed/rejected relationship counts, by type and detecting algorithm.".to_string(),
                input_schema: tools::validation::stats_schema(),
            },
            ToolDescription {
                name: "predict_memory_decay".to_string(),
                description: "Predicts importance decay for one memory and recommends promote/retain/archive/urgent.".to_string(),
                input_schema: tools::decay::predict_schema(),
            },
            ToolDescription {
                name: "get_urgent_memories".to_string(),
                description: "Memories the decay model flags as urgent, highest decay rate first.".to_string(),
                input_schema: tools::decay::urgent_schema(),
            },
            ToolDescription {
                name: "get_promotion_candidates".to_string(),
                description: "Memories the decay model recommends promoting to a higher tier.".to_string(),
                input_schema: tools::decay::promotion_candidates_schema(),
            },
            ToolDescription {
                name: "get_archival_candidates".to_string(),
                description: "Memories the decay model recommends archiving.".to_string(),
                input_schema: tools::decay::archival_candidates_schema(),
            },
            ToolDescription {
                name: "get_decay_insights".to_string(),
                description: "Aggregate decay-bucket distribution and average prediction confidence across the store.".to_string(),
                input_schema: tools::decay::insights_schema(),
            },
            ToolDescription {
                name: "get_monitoring_stats".to_string(),
                description: "Cross-cutting health snapshot: per-tier counts, search cache/analytics, relationship validation stats.".to_string(),
                input_schema: tools::monitoring::schema(),
            },
            ToolDescription {
                name: "get_temporal_context".to_string(),
                description: "Memories around a point in time: items within the exact window, and ordered before/after lists.".to_string(),
                input_schema: tools::temporal::context_schema(),
            },
            ToolDescription {
                name: "get_temporal_patterns".to_string(),
                description: "Daily/weekly/monthly storage histograms and a peak-to-average pattern strength.".to_string(),
                input_schema: tools::temporal::patterns_schema(),
            },
        ];

        let result = ListToolsResult { tools };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing tool call parameters")),
        };

        let router = &self.router;
        let args = &request.arguments;
        let result = match request.name.as_str() {
            "store_memory" => tools::memory::execute_store(router, args).await,
            "search_memory" => tools::memory::execute_search(router, args).await,
            "get_memory_stats" => tools::memory::execute_stats(router).await,
            "advanced_search" => tools::search::execute_advanced_search(router, args).await,
            "semantic_search" => tools::search::execute_semantic_search(router, args).await,
            "temporal_search" => tools::search::execute_temporal_search(router, args).await,
            "build_knowledge_graph" => tools::graph::execute_build_graph(router, args).await,
            "get_memory_relationships" => tools::graph::execute_get_relationships(router, args).await,
            "detect_conflicts" => tools::graph::execute_detect_conflicts(router, args).await,
            "get_memory_versions" => tools::versions::execute(router, args).await,
            "summarize_cluster" => tools::cluster::execute(router, args).await,
            "get_relationship_suggestions" => tools::validation::execute_suggestions(router).await,
            "validate_relationship" => tools::validation::execute_validate(router, args).await,
            "get_validation_stats" => tools::validation::execute_stats(router).await,
            "predict_memory_decay" => tools::decay::execute_predict(router, args).await,
            "get_urgent_memories" => tools::decay::execute_urgent(router, args).await,
            "get_promotion_candidates" => tools::decay::execute_promotion_candidates(router, args).await,
            "get_archival_candidates" => tools::decay::execute_archival_candidates(router, args).await,
            "get_decay_insights" => tools::decay::execute_insights(router).await,
            "get_monitoring_stats" => tools::monitoring::execute(router).await,
            "get_temporal_context" => tools::temporal::execute_context(router, args).await,
            "get_temporal_patterns" => tools::temporal::execute_patterns(router).await,
            name => return Err(JsonRpcError::invalid_params(format!("unknown tool: {name}"))),
        };

        self.tool_call_count.fetch_add(1, Ordering::Relaxed);

        let call_result = match result {
            Ok(value) => CallToolResult::ok(value),
            Err(e) => CallToolResult::error(serde_json::json!({"error": e}).to_string()),
        };
        serde_json::to_value(call_result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn handle_resources_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let resources = vec![
            ResourceDescription {
                uri: "memory://stats".to_string(),
                name: "Memory Statistics".to_string(),
                description: "Current per-tier item counts and capacity stats.".to_string(),
                mime_type: "application/json".to_string(),
            },
            ResourceDescription {
                uri: "memory://urgent".to_string(),
                name: "Urgent Memories".to_string(),
                description: "Memories the decay model flags as needing attention now.".to_string(),
                mime_type: "application/json".to_string(),
            },
            ResourceDescription {
                uri: "memory://validation-queue".to_string(),
                name: "Pending Relationship Suggestions".to_string(),
                description: "Relationship candidates awaiting validation.".to_string(),
                mime_type: "application/json".to_string(),
            },
        ];

        let result = ListResourcesResult { resources };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn handle_resources_read(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: ReadResourceRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing resource uri")),
        };

        let router = &self.router;
        let content = match request.uri.as_str() {
            "memory://stats" => tools::memory::execute_stats(router).await,
            "memory://urgent" => tools::decay::execute_urgent(router, &serde_json::json!({})).await,
            "memory://validation-queue" => tools::validation::execute_suggestions(router).await,
            other => return Err(JsonRpcError::invalid_params(format!("unknown resource: {other}"))),
        };

        match content {
            Ok(value) => {
                let result = ReadResourceResult {
                    contents: vec![ResourceContent {
                        uri: request.uri,
                        mime_type: "application/json".to_string(),
                        text: value.to_string(),
                    }],
                };
                serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
            }
            Err(e) => Err(JsonRpcError::internal_error(e.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::config::StratumConfig;
    use tempfile::TempDir;

    fn test_router() -> (Arc<Router>, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut config = StratumConfig::default();
        config.data_dir = dir.path().to_path_buf();
        (Arc::new(Router::new(config)), dir)
    }

    fn make_request(method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(serde_json::json!(1)),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn initialize_sets_initialized_flag() {
        let (router, _dir) = test_router();
        let mut server = McpServer::new(router);
        assert!(!server.initialized);

        let response = server.handle_request(make_request("initialize", None)).await.unwrap();
        assert!(response.result.is_some());
        assert!(server.initialized);
    }

    #[tokio::test]
    async fn request_before_initialize_is_rejected() {
        let (router, _dir) = test_router();
        let mut server = McpServer::new(router);

        let response = server.handle_request(make_request("tools/list", None)).await.unwrap();
        assert_eq!(response.error.unwrap().code, -32003);
    }

    #[tokio::test]
    async fn tools_list_returns_twenty_two_tools() {
        let (router, _dir) = test_router();
        let mut server = McpServer::new(router);
        server.handle_request(make_request("initialize", None)).await;

        let response = server.handle_request(make_request("tools/list", None)).await.unwrap();
        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 22);
    }

    #[tokio::test]
    async fn store_then_search_round_trips() {
        let (router, _dir) = test_router();
        let mut server = McpServer::new(router);
        server.handle_request(make_request("initialize", None)).await;

        let store_request = make_request(
            "tools/call",
            Some(serde_json::json!({"name": "store_memory", "arguments": {"content": "the launch date is March 3rd"}})),
        );
        let response = server.handle_request(store_request).await.unwrap();
        assert!(response.error.is_none());

        let search_request = make_request(
            "tools/call",
            Some(serde_json::json!({"name": "search_memory", "arguments": {"query": "launch date"}})),
        );
        let response = server.handle_request(search_request).await.unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], serde_json::json!(false));
    }

    #[tokio::test]
    async fn unknown_tool_returns_invalid_params() {
        let (router, _dir) = test_router();
        let mut server = McpServer::new(router);
        server.handle_request(make_request("initialize", None)).await;

        let request = make_request(
            "tools/call",
            Some(serde_json::json!({"name": "nonexistent", "arguments": {}})),
        );
        let response = server.handle_request(request).await.unwrap();
        assert_eq!(response.error.unwrap().code, -32602);
    }
}
