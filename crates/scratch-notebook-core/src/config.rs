//! Typed configuration built once at startup.
//!
//! Values merge in four layers: built-in defaults, then the optional JSON
//! config file, then `SCRATCH_NOTEBOOK_*` environment variables, then CLI
//! flags. Invalid combinations fail with `CONFIG_ERROR` before the server
//! opens storage. There is no hot reload; changes require a restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{ScratchError, ScratchResult};

pub const ENV_PREFIX: &str = "SCRATCH_NOTEBOOK_";

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8765;
pub const DEFAULT_HTTP_PATH: &str = "/http";
pub const DEFAULT_SSE_PATH: &str = "/sse";
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_STORAGE_SUBDIR: &str = "scratch-notebook";
pub const DEFAULT_MAX_SCRATCHPADS: usize = 1024;
pub const DEFAULT_MAX_CELLS_PER_PAD: usize = 1024;
pub const DEFAULT_MAX_CELL_BYTES: usize = 5_242_880;
pub const DEFAULT_PREEMPT_AGE: &str = "24h";
pub const DEFAULT_PREEMPT_INTERVAL: &str = "10m";
pub const DEFAULT_VALIDATION_TIMEOUT: &str = "10s";
pub const DEFAULT_SHUTDOWN_TIMEOUT: &str = "5s";
pub const DEFAULT_EMBEDDING_MODEL: &str = "debug-hash";
pub const DEFAULT_EMBEDDING_DEVICE: &str = "cpu";
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 16;
pub const DEFAULT_SEMANTIC_SEARCH_LIMIT: usize = 50;

/// Field names recognized across all layers, with their environment names.
const ENV_FIELD_MAP: &[(&str, &str)] = &[
    ("config_file", "CONFIG_FILE"),
    ("storage_dir", "STORAGE_DIR"),
    ("enable_stdio", "ENABLE_STDIO"),
    ("enable_http", "ENABLE_HTTP"),
    ("enable_sse", "ENABLE_SSE"),
    ("enable_metrics", "ENABLE_METRICS"),
    ("enable_auth", "ENABLE_AUTH"),
    ("enable_semantic_search", "ENABLE_SEMANTIC_SEARCH"),
    ("auth_bearer_token", "AUTH_BEARER_TOKEN"),
    ("auth_token_file", "AUTH_TOKEN_FILE"),
    ("http_host", "HTTP_HOST"),
    ("http_port", "HTTP_PORT"),
    ("http_socket_path", "HTTP_SOCKET_PATH"),
    ("http_path", "HTTP_PATH"),
    ("sse_path", "SSE_PATH"),
    ("metrics_path", "METRICS_PATH"),
    ("max_scratchpads", "MAX_SCRATCHPADS"),
    ("max_cells_per_pad", "MAX_CELLS_PER_PAD"),
    ("max_cell_bytes", "MAX_CELL_BYTES"),
    ("eviction_policy", "EVICTION_POLICY"),
    ("preempt_age", "PREEMPT_AGE"),
    ("preempt_interval", "PREEMPT_INTERVAL"),
    ("validation_request_timeout", "VALIDATION_TIMEOUT"),
    ("shutdown_timeout", "SHUTDOWN_TIMEOUT"),
    ("embedding_model", "EMBEDDING_MODEL"),
    ("embedding_device", "EMBEDDING_DEVICE"),
    ("embedding_batch_size", "EMBEDDING_BATCH_SIZE"),
    ("semantic_search_limit", "SEMANTIC_SEARCH_LIMIT"),
];

/// Eviction policy active for the whole process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    Discard,
    Fail,
    Preempt,
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Discard => "discard",
            EvictionPolicy::Fail => "fail",
            EvictionPolicy::Preempt => "preempt",
        }
    }
}

impl std::str::FromStr for EvictionPolicy {
    type Err = ScratchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(EvictionPolicy::Discard),
            "fail" => Ok(EvictionPolicy::Fail),
            "preempt" => Ok(EvictionPolicy::Preempt),
            _ => Err(ScratchError::config(
                "eviction_policy must be one of: discard, fail, preempt",
            )),
        }
    }
}

/// One `principal:token` registry entry. Order matters: the first entry is
/// the tenant that receives implicit-default pads on first auth enablement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub principal: String,
    pub token: String,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub config_file: Option<PathBuf>,
    pub storage_dir: PathBuf,
    pub enable_stdio: bool,
    pub enable_http: bool,
    pub enable_sse: bool,
    pub enable_metrics: bool,
    pub enable_auth: bool,
    pub enable_semantic_search: bool,
    pub auth_bearer_token: Option<String>,
    pub auth_token_file: Option<PathBuf>,
    pub auth_tokens: Vec<TokenRecord>,
    pub http_host: String,
    pub http_port: u16,
    pub http_socket_path: Option<PathBuf>,
    pub http_path: String,
    pub sse_path: String,
    pub metrics_path: String,
    pub max_scratchpads: usize,
    pub max_cells_per_pad: usize,
    pub max_cell_bytes: usize,
    pub eviction_policy: EvictionPolicy,
    pub preempt_age: Duration,
    pub preempt_interval: Duration,
    pub validation_request_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub embedding_model: String,
    pub embedding_device: String,
    pub embedding_batch_size: usize,
    pub semantic_search_limit: usize,
}

impl Config {
    /// Merge defaults, config file, environment, and CLI values, then
    /// normalize into a typed configuration.
    ///
    /// `cli_values` uses the field names from `ENV_FIELD_MAP` plus
    /// `auth_tokens` (array of `principal:token` strings).
    pub fn load(
        cli_values: Map<String, Value>,
        environ: &HashMap<String, String>,
    ) -> ScratchResult<Config> {
        let env_values = extract_env_values(environ);

        let config_path = cli_values
            .get("config_file")
            .or_else(|| env_values.get("config_file"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let file_values = load_config_file(config_path.as_deref())?;

        let mut merged = Map::new();
        merge_layer(&mut merged, &file_values);
        merge_layer(&mut merged, &env_values);
        merge_layer(&mut merged, &cli_values);

        let config = normalize_values(&merged, config_path.as_deref())?;
        config.materialize()?;
        Ok(config)
    }

    /// Write the resolved config file and auth token file on first run when
    /// paths are configured and the files do not exist yet.
    pub fn materialize(&self) -> ScratchResult<()> {
        if let Some(path) = &self.config_file {
            write_if_missing(path, &self.serialize_file())?;
        }
        if let Some(path) = &self.auth_token_file {
            write_if_missing(path, &self.serialize_auth_registry())?;
        }
        Ok(())
    }

    /// JSON document written when materializing a missing config file.
    pub fn serialize_file(&self) -> Value {
        serde_json::json!({
            "storage_dir": self.storage_dir.to_string_lossy(),
            "enable_stdio": self.enable_stdio,
            "enable_http": self.enable_http,
            "enable_sse": self.enable_sse,
            "enable_metrics": self.enable_metrics,
            "enable_auth": self.enable_auth,
            "enable_semantic_search": self.enable_semantic_search,
            "http_host": self.http_host,
            "http_port": self.http_port,
            "http_path": self.http_path,
            "sse_path": self.sse_path,
            "metrics_path": self.metrics_path,
            "max_scratchpads": self.max_scratchpads,
            "max_cells_per_pad": self.max_cells_per_pad,
            "max_cell_bytes": self.max_cell_bytes,
            "eviction_policy": self.eviction_policy.as_str(),
            "preempt_age": format_duration(self.preempt_age, 'h'),
            "preempt_interval": format_duration(self.preempt_interval, 'm'),
            "validation_request_timeout": format_duration(self.validation_request_timeout, 's'),
            "shutdown_timeout": format_duration(self.shutdown_timeout, 's'),
            "embedding_model": self.embedding_model,
            "embedding_device": self.embedding_device,
            "embedding_batch_size": self.embedding_batch_size,
            "semantic_search_limit": self.semantic_search_limit,
        })
    }

    fn serialize_auth_registry(&self) -> Value {
        let mut tokens = Map::new();
        let mut ordered = self.auth_tokens.clone();
        ordered.sort_by(|a, b| a.principal.cmp(&b.principal));
        for record in ordered {
            tokens.insert(record.principal, Value::String(record.token));
        }
        serde_json::json!({ "tokens": tokens })
    }

    /// First configured principal, if any; the tenant that owns migrated
    /// implicit-default pads.
    pub fn first_principal(&self) -> Option<&str> {
        self.auth_tokens.first().map(|r| r.principal.as_str())
    }
}

fn extract_env_values(environ: &HashMap<String, String>) -> Map<String, Value> {
    let mut values = Map::new();
    for (field, suffix) in ENV_FIELD_MAP {
        let env_name = format!("{ENV_PREFIX}{suffix}");
        if let Some(value) = environ.get(&env_name) {
            values.insert((*field).to_string(), Value::String(value.clone()));
        }
    }
    values
}

fn load_config_file(path: Option<&str>) -> ScratchResult<Map<String, Value>> {
    let Some(path) = path else {
        return Ok(Map::new());
    };
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(_) => return Err(ScratchError::config("Unable to read config file")),
    };
    let parsed: Value = serde_json::from_str(&contents)
        .map_err(|_| ScratchError::config("Config file is not valid JSON"))?;
    let Value::Object(map) = parsed else {
        return Err(ScratchError::config("Config file must contain a JSON object"));
    };
    let known: std::collections::HashSet<&str> = ENV_FIELD_MAP
        .iter()
        .map(|(field, _)| *field)
        .chain(["auth_tokens"])
        .collect();
    Ok(map
        .into_iter()
        .filter(|(key, _)| known.contains(key.as_str()))
        .collect())
}

fn merge_layer(base: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        if value.is_null() {
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}

fn normalize_values(values: &Map<String, Value>, config_path: Option<&str>) -> ScratchResult<Config> {
    let storage_dir = match values.get("storage_dir") {
        Some(value) => parse_path(value, "storage_dir")?,
        None => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_STORAGE_SUBDIR),
    };

    let enable_stdio = parse_bool(values.get("enable_stdio"), true)?;
    let enable_http = parse_bool(values.get("enable_http"), true)?;
    let enable_sse = parse_bool(values.get("enable_sse"), true)?;
    let enable_metrics = parse_bool(values.get("enable_metrics"), false)?;
    let enable_auth = parse_bool(values.get("enable_auth"), false)?;
    let enable_semantic_search = parse_bool(values.get("enable_semantic_search"), true)?;

    if enable_metrics && !enable_http {
        return Err(ScratchError::config(
            "enable_metrics requires enable_http to be true",
        ));
    }

    let http_host = parse_string(values.get("http_host"), DEFAULT_HTTP_HOST);
    let http_port = parse_int(values.get("http_port"), DEFAULT_HTTP_PORT as i64, "http_port")?;
    if !(0..=65535).contains(&http_port) {
        return Err(ScratchError::config("http_port must be <= 65535"));
    }
    let http_socket_path = parse_optional_path(values.get("http_socket_path"), "http_socket_path")?;
    let http_path = parse_string(values.get("http_path"), DEFAULT_HTTP_PATH);
    let sse_path = parse_string(values.get("sse_path"), DEFAULT_SSE_PATH);
    let metrics_path = parse_string(values.get("metrics_path"), DEFAULT_METRICS_PATH);

    if http_path == sse_path {
        return Err(ScratchError::config("http_path and sse_path must be distinct"));
    }

    let max_scratchpads = parse_limit(values.get("max_scratchpads"), DEFAULT_MAX_SCRATCHPADS, "max_scratchpads")?;
    let max_cells_per_pad = parse_limit(
        values.get("max_cells_per_pad"),
        DEFAULT_MAX_CELLS_PER_PAD,
        "max_cells_per_pad",
    )?;
    let max_cell_bytes = parse_limit(values.get("max_cell_bytes"), DEFAULT_MAX_CELL_BYTES, "max_cell_bytes")?;

    let eviction_policy: EvictionPolicy = parse_string(values.get("eviction_policy"), "discard").parse()?;

    let preempt_age = parse_duration_value(values.get("preempt_age"), DEFAULT_PREEMPT_AGE, 'h', "preempt_age")?;
    let preempt_interval = parse_duration_value(
        values.get("preempt_interval"),
        DEFAULT_PREEMPT_INTERVAL,
        'm',
        "preempt_interval",
    )?;
    let validation_request_timeout = parse_duration_value(
        values.get("validation_request_timeout"),
        DEFAULT_VALIDATION_TIMEOUT,
        's',
        "validation_request_timeout",
    )?;
    let shutdown_timeout = parse_duration_value(
        values.get("shutdown_timeout"),
        DEFAULT_SHUTDOWN_TIMEOUT,
        's',
        "shutdown_timeout",
    )?;

    let embedding_model = parse_string(values.get("embedding_model"), DEFAULT_EMBEDDING_MODEL);
    let embedding_device = parse_string(values.get("embedding_device"), DEFAULT_EMBEDDING_DEVICE);
    let embedding_batch_size = parse_int(
        values.get("embedding_batch_size"),
        DEFAULT_EMBEDDING_BATCH_SIZE as i64,
        "embedding_batch_size",
    )?;
    if embedding_batch_size < 1 {
        return Err(ScratchError::config("embedding_batch_size must be >= 1"));
    }
    let semantic_search_limit = parse_int(
        values.get("semantic_search_limit"),
        DEFAULT_SEMANTIC_SEARCH_LIMIT as i64,
        "semantic_search_limit",
    )?;
    if semantic_search_limit < 1 {
        return Err(ScratchError::config("semantic_search_limit must be >= 1"));
    }

    let auth_bearer_token = values
        .get("auth_bearer_token")
        .and_then(Value::as_str)
        .map(str::to_string);
    let auth_token_file = parse_optional_path(values.get("auth_token_file"), "auth_token_file")?;

    let mut auth_tokens = coerce_auth_tokens(values.get("auth_tokens"))?;
    for record in load_auth_token_registry(auth_token_file.as_deref())? {
        if !auth_tokens.iter().any(|r| r.principal == record.principal) {
            auth_tokens.push(record);
        }
    }
    if let Some(token) = &auth_bearer_token {
        if !auth_tokens.iter().any(|r| r.principal == "default") {
            auth_tokens.push(TokenRecord {
                principal: "default".into(),
                token: token.clone(),
            });
        }
    }

    Ok(Config {
        config_file: config_path.map(PathBuf::from),
        storage_dir,
        enable_stdio,
        enable_http,
        enable_sse,
        enable_metrics,
        enable_auth,
        enable_semantic_search,
        auth_bearer_token,
        auth_token_file,
        auth_tokens,
        http_host,
        http_port: http_port as u16,
        http_socket_path,
        http_path,
        sse_path,
        metrics_path,
        max_scratchpads,
        max_cells_per_pad,
        max_cell_bytes,
        eviction_policy,
        preempt_age,
        preempt_interval,
        validation_request_timeout,
        shutdown_timeout,
        embedding_model,
        embedding_device,
        embedding_batch_size: embedding_batch_size as usize,
        semantic_search_limit: semantic_search_limit as usize,
    })
}

fn load_auth_token_registry(path: Option<&Path>) -> ScratchResult<Vec<TokenRecord>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|_| ScratchError::config("Unable to read auth token file"))?;
    let parsed: Value = serde_json::from_str(&contents)
        .map_err(|_| ScratchError::config("Auth token file is not valid JSON"))?;
    let Some(tokens) = parsed.get("tokens") else {
        return Ok(Vec::new());
    };
    let Value::Object(map) = tokens else {
        return Err(ScratchError::config(
            "Auth token file must contain a 'tokens' object",
        ));
    };
    let mut registry = Vec::new();
    for (principal, value) in map {
        let token = value
            .as_str()
            .ok_or_else(|| ScratchError::config("Auth token values must be strings"))?;
        registry.push(make_token_record(principal, token)?);
    }
    Ok(registry)
}

fn coerce_auth_tokens(raw: Option<&Value>) -> ScratchResult<Vec<TokenRecord>> {
    let mut registry = Vec::new();
    match raw {
        None | Some(Value::Null) => {}
        Some(Value::String(entry)) => registry.push(parse_token_entry(entry)?),
        Some(Value::Array(entries)) => {
            for entry in entries {
                let text = entry
                    .as_str()
                    .ok_or_else(|| ScratchError::config("Auth token arguments must be strings"))?;
                let record = parse_token_entry(text)?;
                registry.retain(|r: &TokenRecord| r.principal != record.principal);
                registry.push(record);
            }
        }
        Some(Value::Object(map)) => {
            for (principal, value) in map {
                let token = value
                    .as_str()
                    .ok_or_else(|| ScratchError::config("Auth token values must be strings"))?;
                registry.push(make_token_record(principal, token)?);
            }
        }
        Some(_) => {
            return Err(ScratchError::config(
                "Auth tokens must be provided as an object or array of strings",
            ))
        }
    }
    Ok(registry)
}

fn parse_token_entry(entry: &str) -> ScratchResult<TokenRecord> {
    let Some((principal, token)) = entry.split_once(':') else {
        return Err(ScratchError::config(
            "Auth token arguments must use 'principal:token' syntax",
        ));
    };
    make_token_record(principal, token)
}

fn make_token_record(principal: &str, token: &str) -> ScratchResult<TokenRecord> {
    let principal = principal.trim();
    let token = token.trim();
    if principal.is_empty() || token.is_empty() {
        return Err(ScratchError::config(
            "Auth token arguments must include non-empty principal and token",
        ));
    }
    if principal.contains('\0') {
        return Err(ScratchError::config(
            "Auth token principals must not contain NUL bytes",
        ));
    }
    Ok(TokenRecord {
        principal: principal.to_string(),
        token: token.to_string(),
    })
}

/// Parse a duration string matching `\d+(s|m|h)?` with a field-specific
/// default unit.
pub fn parse_duration(value: &str, default_unit: char) -> Option<Duration> {
    let stripped = value.trim();
    if stripped.is_empty() {
        return None;
    }
    let (number_part, unit) = match stripped.chars().last() {
        Some(suffix @ ('s' | 'm' | 'h')) => (&stripped[..stripped.len() - 1], suffix),
        Some(suffix @ ('S' | 'M' | 'H')) => {
            (&stripped[..stripped.len() - 1], suffix.to_ascii_lowercase())
        }
        _ => (stripped, default_unit),
    };
    if number_part.is_empty() || !number_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = number_part.parse().ok()?;
    let factor = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        _ => return None,
    };
    Some(Duration::from_secs(amount * factor))
}

/// Re-serialize a duration with its preferred unit when it divides evenly.
pub fn format_duration(duration: Duration, preferred_unit: char) -> String {
    let total = duration.as_secs();
    let factor = match preferred_unit {
        'h' => 3600,
        'm' => 60,
        _ => 1,
    };
    if factor > 1 && total % factor == 0 {
        format!("{}{}", total / factor, preferred_unit)
    } else {
        format!("{total}s")
    }
}

fn parse_duration_value(
    value: Option<&Value>,
    default: &str,
    default_unit: char,
    field: &str,
) -> ScratchResult<Duration> {
    let raw = match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(ScratchError::config(format!("Invalid duration for {field}"))),
    };
    parse_duration(&raw, default_unit).ok_or_else(|| {
        ScratchError::config(format!(
            "{field} must be a non-negative integer optionally suffixed with s, m, or h"
        ))
    })
}

fn parse_bool(value: Option<&Value>, default: bool) -> ScratchResult<bool> {
    match value {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(default)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
            "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
            other => Err(ScratchError::config(format!("Invalid boolean value: {other:?}"))),
        },
        Some(other) => Err(ScratchError::config(format!("Invalid boolean value: {other}"))),
    }
}

fn parse_string(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    }
}

fn parse_int(value: Option<&Value>, default: i64, field: &str) -> ScratchResult<i64> {
    match value {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ScratchError::config(format!("Invalid integer for {field}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| ScratchError::config(format!("Invalid integer for {field}"))),
        Some(_) => Err(ScratchError::config(format!("Invalid integer for {field}"))),
    }
}

fn parse_limit(value: Option<&Value>, default: usize, field: &str) -> ScratchResult<usize> {
    let parsed = parse_int(value, default as i64, field)?;
    if parsed < 0 {
        return Err(ScratchError::config(format!("{field} must be >= 0")));
    }
    Ok(parsed as usize)
}

fn parse_path(value: &Value, field: &str) -> ScratchResult<PathBuf> {
    let text = value
        .as_str()
        .ok_or_else(|| ScratchError::config(format!("Invalid path for {field}")))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ScratchError::config(format!("{field} may not be empty")));
    }
    Ok(PathBuf::from(trimmed))
}

fn parse_optional_path(value: Option<&Value>, field: &str) -> ScratchResult<Option<PathBuf>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(other) => parse_path(other, field).map(Some),
    }
}

fn write_if_missing(path: &Path, payload: &Value) -> ScratchResult<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|_| ScratchError::config("Unable to create configuration directory"))?;
    }
    let mut body = serde_json::to_string_pretty(payload)
        .map_err(|_| ScratchError::config("Unable to serialize configuration"))?;
    body.push('\n');
    std::fs::write(path, body).map_err(|_| ScratchError::config("Unable to write configuration file"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(cli: Map<String, Value>, env: &[(&str, &str)]) -> ScratchResult<Config> {
        let environ: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::load(cli, &environ)
    }

    #[test]
    fn defaults_are_applied() {
        let config = load(Map::new(), &[]).unwrap();
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.http_path, "/http");
        assert_eq!(config.sse_path, "/sse");
        assert_eq!(config.max_scratchpads, 1024);
        assert_eq!(config.eviction_policy, EvictionPolicy::Discard);
        assert_eq!(config.preempt_age, Duration::from_secs(24 * 3600));
        assert_eq!(config.preempt_interval, Duration::from_secs(600));
        assert_eq!(config.validation_request_timeout, Duration::from_secs(10));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.embedding_model, "debug-hash");
        assert!(config.enable_stdio && config.enable_http && config.enable_sse);
        assert!(!config.enable_metrics && !config.enable_auth);
    }

    #[test]
    fn cli_overrides_env() {
        let mut cli = Map::new();
        cli.insert("http_port".into(), Value::String("9000".into()));
        let config = load(cli, &[("SCRATCH_NOTEBOOK_HTTP_PORT", "9001")]).unwrap();
        assert_eq!(config.http_port, 9000);
    }

    #[test]
    fn env_values_are_parsed() {
        let config = load(
            Map::new(),
            &[
                ("SCRATCH_NOTEBOOK_ENABLE_METRICS", "true"),
                ("SCRATCH_NOTEBOOK_MAX_CELL_BYTES", "1024"),
                ("SCRATCH_NOTEBOOK_EVICTION_POLICY", "preempt"),
            ],
        )
        .unwrap();
        assert!(config.enable_metrics);
        assert_eq!(config.max_cell_bytes, 1024);
        assert_eq!(config.eviction_policy, EvictionPolicy::Preempt);
    }

    #[test]
    fn metrics_without_http_is_config_error() {
        let mut cli = Map::new();
        cli.insert("enable_metrics".into(), Value::String("true".into()));
        cli.insert("enable_http".into(), Value::String("false".into()));
        let err = load(cli, &[]).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigError);
    }

    #[test]
    fn identical_http_and_sse_paths_rejected() {
        let mut cli = Map::new();
        cli.insert("http_path".into(), Value::String("/same".into()));
        cli.insert("sse_path".into(), Value::String("/same".into()));
        assert!(load(cli, &[]).is_err());
    }

    #[test]
    fn duration_parsing_uses_default_units() {
        assert_eq!(parse_duration("24", 'h'), Some(Duration::from_secs(86400)));
        assert_eq!(parse_duration("10", 'm'), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration("5", 's'), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("90s", 'h'), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("2h", 's'), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("", 's'), None);
        assert_eq!(parse_duration("abc", 's'), None);
        assert_eq!(parse_duration("-5", 's'), None);
    }

    #[test]
    fn duration_formatting_prefers_unit() {
        assert_eq!(format_duration(Duration::from_secs(86400), 'h'), "24h");
        assert_eq!(format_duration(Duration::from_secs(90), 'm'), "90s");
        assert_eq!(format_duration(Duration::from_secs(600), 'm'), "10m");
    }

    #[test]
    fn cli_tokens_precede_file_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join("tokens.json");
        std::fs::write(
            &token_file,
            "{\"tokens\": {\"filer\": \"ftok\", \"shared\": \"old\"}}",
        )
        .unwrap();

        let mut cli = Map::new();
        cli.insert(
            "auth_tokens".into(),
            Value::Array(vec![
                Value::String("alpha:atok".into()),
                Value::String("shared:new".into()),
            ]),
        );
        cli.insert(
            "auth_token_file".into(),
            Value::String(token_file.to_string_lossy().into_owned()),
        );
        let config = load(cli, &[]).unwrap();

        assert_eq!(config.first_principal(), Some("alpha"));
        let shared = config
            .auth_tokens
            .iter()
            .find(|r| r.principal == "shared")
            .unwrap();
        assert_eq!(shared.token, "new");
        assert!(config.auth_tokens.iter().any(|r| r.principal == "filer"));
    }

    #[test]
    fn bearer_token_registers_default_principal() {
        let mut cli = Map::new();
        cli.insert("auth_bearer_token".into(), Value::String("tok".into()));
        let config = load(cli, &[]).unwrap();
        assert!(config
            .auth_tokens
            .iter()
            .any(|r| r.principal == "default" && r.token == "tok"));
    }

    #[test]
    fn malformed_token_entry_is_config_error() {
        let mut cli = Map::new();
        cli.insert(
            "auth_tokens".into(),
            Value::Array(vec![Value::String("missing-colon".into())]),
        );
        assert!(load(cli, &[]).is_err());
    }

    #[test]
    fn config_file_layer_sits_below_env() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("config.json");
        std::fs::write(&config_file, "{\"http_port\": 9100, \"max_scratchpads\": 7}").unwrap();

        let mut cli = Map::new();
        cli.insert(
            "config_file".into(),
            Value::String(config_file.to_string_lossy().into_owned()),
        );
        let config = load(cli, &[("SCRATCH_NOTEBOOK_HTTP_PORT", "9200")]).unwrap();
        assert_eq!(config.http_port, 9200);
        assert_eq!(config.max_scratchpads, 7);
    }

    #[test]
    fn missing_config_file_is_materialized() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("generated.json");
        let mut cli = Map::new();
        cli.insert(
            "config_file".into(),
            Value::String(config_file.to_string_lossy().into_owned()),
        );
        let _config = load(cli, &[]).unwrap();
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&config_file).unwrap()).unwrap();
        assert_eq!(written["preempt_age"], "24h");
        assert_eq!(written["preempt_interval"], "10m");
        assert_eq!(written["shutdown_timeout"], "5s");
    }

    #[test]
    fn zero_limits_mean_unlimited() {
        let mut cli = Map::new();
        cli.insert("max_scratchpads".into(), Value::String("0".into()));
        cli.insert("max_cell_bytes".into(), Value::String("0".into()));
        let config = load(cli, &[]).unwrap();
        assert_eq!(config.max_scratchpads, 0);
        assert_eq!(config.max_cell_bytes, 0);
    }
}
