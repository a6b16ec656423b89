//! stdio transport for MCP: JSON-RPC 2.0, one frame per line, stdout
//! reserved for protocol frames (logging goes to stderr, see `main.rs`).

use std::io::{self, BufRead, BufReader, Write};

use tracing::{debug, error, warn};

use super::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::server::McpServer;

pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(self, mut server: McpServer) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let reader = BufReader::new(stdin.lock());
        let mut stdout = stdout.lock();

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!("failed to read line: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            debug!(bytes = line.len(), "received frame");

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    warn!("failed to parse request: {e}");
                    Self::write_response(&mut stdout, &JsonRpcResponse::error(None, JsonRpcError::parse_error()))?;
                    continue;
                }
            };

            if let Some(response) = server.handle_request(request).await {
                Self::write_response(&mut stdout, &response)?;
            }
        }
        Ok(())
    }

    fn write_response(stdout: &mut impl Write, response: &JsonRpcResponse) -> io::Result<()> {
        match serde_json::to_string(response) {
            Ok(json) => {
                writeln!(stdout, "{json}")?;
                stdout.flush()
            }
            Err(e) => {
                error!("failed to serialize response: {e}");
                writeln!(stdout, r#"{{"jsonrpc":"2.0","id":null,"error":{{"code":-32603,"message":"Internal error"}}}}"#)?;
                stdout.flush()
            }
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}
