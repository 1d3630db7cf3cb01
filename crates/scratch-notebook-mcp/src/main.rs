//! CLI entrypoint for the scratch notebook MCP server.

use std::collections::HashMap;

use clap::Parser;
use serde_json::{Map, Value};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use scratch_notebook_core::Config;
use scratch_notebook_mcp::ScratchServer;

/// Scratch Notebook MCP server.
///
/// Flags override `SCRATCH_NOTEBOOK_*` environment variables, which override
/// the optional JSON config file.
#[derive(Parser, Debug)]
#[command(name = "scratch-notebook", version, about = "Scratch Notebook MCP server")]
struct Cli {
    /// Path to a JSON configuration file (created on first run if missing).
    #[arg(long, value_name = "PATH")]
    config_file: Option<String>,

    /// Directory for the storage dataset.
    #[arg(long, value_name = "PATH")]
    storage_dir: Option<String>,

    /// Enable the MCP stdio transport (default: true).
    #[arg(long, value_name = "BOOL")]
    enable_stdio: Option<String>,

    /// Enable the MCP HTTP endpoint (default: true).
    #[arg(long, value_name = "BOOL")]
    enable_http: Option<String>,

    /// Enable the MCP SSE stream (default: true).
    #[arg(long, value_name = "BOOL")]
    enable_sse: Option<String>,

    /// Expose Prometheus metrics (requires HTTP; default: false).
    #[arg(long, value_name = "BOOL")]
    enable_metrics: Option<String>,

    /// Enable bearer-token authentication (default: false).
    #[arg(long, value_name = "BOOL")]
    enable_auth: Option<String>,

    /// Toggle semantic search and embeddings (default: true).
    #[arg(long, value_name = "BOOL")]
    enable_semantic_search: Option<String>,

    /// Register a default bearer token for HTTP/SSE requests.
    #[arg(long, value_name = "TOKEN")]
    auth_bearer_token: Option<String>,

    /// JSON file storing principal:token mappings (created on first run).
    #[arg(long, value_name = "PATH")]
    auth_token_file: Option<String>,

    /// Add a bearer token mapping (repeatable; CLI entries come first).
    #[arg(long = "auth-token", value_name = "PRINCIPAL:TOKEN")]
    auth_tokens: Vec<String>,

    /// HTTP listener host (default: 127.0.0.1).
    #[arg(long, value_name = "HOST")]
    http_host: Option<String>,

    /// HTTP listener port (default: 8765).
    #[arg(long, value_name = "PORT")]
    http_port: Option<String>,

    /// Unix domain socket path for the HTTP/SSE listener (optional).
    #[arg(long, value_name = "PATH")]
    http_socket_path: Option<String>,

    /// HTTP RPC path for tool calls (default: /http).
    #[arg(long, value_name = "PATH")]
    http_path: Option<String>,

    /// SSE stream path (default: /sse).
    #[arg(long, value_name = "PATH")]
    sse_path: Option<String>,

    /// Metrics endpoint path (default: /metrics).
    #[arg(long, value_name = "PATH")]
    metrics_path: Option<String>,

    /// Maximum scratchpads per tenant (0 for unlimited; default: 1024).
    #[arg(long, value_name = "INT")]
    max_scratchpads: Option<String>,

    /// Maximum cells per scratchpad (0 for unlimited; default: 1024).
    #[arg(long, value_name = "INT")]
    max_cells_per_pad: Option<String>,

    /// Maximum bytes per cell (0 for unlimited; default: 5242880).
    #[arg(long, value_name = "INT")]
    max_cell_bytes: Option<String>,

    /// Eviction policy at capacity: discard, fail, or preempt.
    #[arg(long, value_name = "MODE")]
    eviction_policy: Option<String>,

    /// Age threshold for the preempt sweeper (default: 24h).
    #[arg(long, value_name = "DURATION")]
    preempt_age: Option<String>,

    /// Interval for the preempt sweeper (default: 10m).
    #[arg(long, value_name = "DURATION")]
    preempt_interval: Option<String>,

    /// Timeout for validation requests (default: 10s).
    #[arg(long, value_name = "DURATION")]
    validation_request_timeout: Option<String>,

    /// Graceful shutdown timeout (default: 5s).
    #[arg(long, value_name = "DURATION")]
    shutdown_timeout: Option<String>,

    /// Embedding model identifier (default: debug-hash).
    #[arg(long, value_name = "NAME")]
    embedding_model: Option<String>,

    /// Embedding device (default: cpu).
    #[arg(long, value_name = "DEVICE")]
    embedding_device: Option<String>,

    /// Embedding batch size (default: 16).
    #[arg(long, value_name = "INT")]
    embedding_batch_size: Option<String>,

    /// Maximum semantic search result limit (default: 50).
    #[arg(long, value_name = "INT")]
    semantic_search_limit: Option<String>,
}

impl Cli {
    fn into_values(self) -> Map<String, Value> {
        let mut values = Map::new();
        let mut set = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                values.insert(key.to_string(), Value::String(value));
            }
        };
        set("config_file", self.config_file);
        set("storage_dir", self.storage_dir);
        set("enable_stdio", self.enable_stdio);
        set("enable_http", self.enable_http);
        set("enable_sse", self.enable_sse);
        set("enable_metrics", self.enable_metrics);
        set("enable_auth", self.enable_auth);
        set("enable_semantic_search", self.enable_semantic_search);
        set("auth_bearer_token", self.auth_bearer_token);
        set("auth_token_file", self.auth_token_file);
        set("http_host", self.http_host);
        set("http_port", self.http_port);
        set("http_socket_path", self.http_socket_path);
        set("http_path", self.http_path);
        set("sse_path", self.sse_path);
        set("metrics_path", self.metrics_path);
        set("max_scratchpads", self.max_scratchpads);
        set("max_cells_per_pad", self.max_cells_per_pad);
        set("max_cell_bytes", self.max_cell_bytes);
        set("eviction_policy", self.eviction_policy);
        set("preempt_age", self.preempt_age);
        set("preempt_interval", self.preempt_interval);
        set("validation_request_timeout", self.validation_request_timeout);
        set("shutdown_timeout", self.shutdown_timeout);
        set("embedding_model", self.embedding_model);
        set("embedding_device", self.embedding_device);
        set("embedding_batch_size", self.embedding_batch_size);
        set("semantic_search_limit", self.semantic_search_limit);
        if !self.auth_tokens.is_empty() {
            values.insert(
                "auth_tokens".to_string(),
                Value::Array(self.auth_tokens.into_iter().map(Value::String).collect()),
            );
        }
        values
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let environ: HashMap<String, String> = std::env::vars().collect();

    let config = match Config::load(cli.into_values(), &environ) {
        Ok(config) => config,
        Err(err) => {
            error!(code = %err.code, error = %err, "configuration failed");
            std::process::exit(2);
        }
    };

    info!(
        storage_dir = %config.storage_dir.display(),
        enable_stdio = config.enable_stdio,
        enable_http = config.enable_http,
        enable_sse = config.enable_sse,
        enable_metrics = config.enable_metrics,
        enable_auth = config.enable_auth,
        eviction_policy = config.eviction_policy.as_str(),
        "configuration loaded"
    );

    let server = match ScratchServer::initialize(config) {
        Ok(server) => server,
        Err(err) => {
            error!(code = %err.code, error = %err, "failed to initialize server");
            std::process::exit(1);
        }
    };

    if let Err(err) = server.run().await {
        error!(error = %err, "server terminated with an error");
        std::process::exit(1);
    }
}
