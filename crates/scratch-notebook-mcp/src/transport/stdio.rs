//! Stdio MCP transport: newline-delimited JSON-RPC on stdin/stdout.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::handlers::Handlers;
use crate::shutdown::{ServerState, ShutdownGate};

/// Serve MCP over stdio until stdin closes or the gate stops.
pub async fn run_stdio(handlers: Arc<Handlers>, gate: ShutdownGate) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();
    let mut shutdown = gate.subscribe();

    info!("stdio transport ready");
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed, stopping stdio transport");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = handlers.handle_request(&line, None).await;
                if response.is_empty_notification() {
                    continue;
                }
                let body = serde_json::to_string(&response)?;
                stdout.write_all(body.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() == ServerState::Stopped {
                    break;
                }
            }
        }
    }
    Ok(())
}
