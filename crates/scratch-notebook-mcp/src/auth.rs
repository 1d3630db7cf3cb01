//! Bearer-token tenancy.
//!
//! The registry is static, built from config at startup. Resolving a token
//! yields the principal, which is the tenant id for every store and search
//! call. When auth is disabled every request runs as the implicit default
//! tenant.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use scratch_notebook_core::{Config, ScratchResult, DEFAULT_TENANT_ID};
use scratch_notebook_storage::CatalogStore;

/// Static token registry. Entry order matters: the first principal owns
/// migrated implicit-default pads.
pub struct TokenRegistry {
    principals: Vec<String>,
    by_token: HashMap<String, String>,
}

impl TokenRegistry {
    /// Build from config; `None` when auth is disabled or no tokens are
    /// configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.enable_auth || config.auth_tokens.is_empty() {
            return None;
        }
        let principals = config
            .auth_tokens
            .iter()
            .map(|r| r.principal.clone())
            .collect();
        let by_token = config
            .auth_tokens
            .iter()
            .map(|r| (r.token.clone(), r.principal.clone()))
            .collect();
        Some(Self {
            principals,
            by_token,
        })
    }

    /// The tenant that owns migrated implicit-default pads.
    pub fn first_principal(&self) -> &str {
        &self.principals[0]
    }

    /// Resolve a raw bearer token to its principal.
    pub fn resolve_token(&self, token: &str) -> Option<&str> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return None;
        }
        self.by_token.get(trimmed).map(String::as_str)
    }

    /// Resolve an `Authorization` header value.
    pub fn resolve_bearer_header(&self, header: &str) -> Option<&str> {
        let token = header.strip_prefix("Bearer ").unwrap_or(header);
        self.resolve_token(token)
    }
}

/// One-time first-enable migration: when auth is on and pads exist under
/// the implicit default tenant, reassign them to the first configured
/// principal and emit an audit record.
pub fn run_startup_migration(
    store: &Arc<CatalogStore>,
    registry: Option<&TokenRegistry>,
    config: &Config,
) -> ScratchResult<()> {
    if !config.enable_auth {
        return Ok(());
    }
    let Some(registry) = registry else {
        warn!("auth enabled but no tokens configured; tenant migration skipped");
        return Ok(());
    };
    let target = registry.first_principal();
    let migrated = store.migrate_default_tenant(target)?;
    if !migrated.is_empty() {
        info!(
            from = DEFAULT_TENANT_ID,
            to = target,
            pad_count = migrated.len(),
            scratchpad_ids = ?migrated,
            "default-tenant migration completed"
        );
    }
    Ok(())
}
