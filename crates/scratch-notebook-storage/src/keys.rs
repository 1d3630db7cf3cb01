//! Composite key builders.
//!
//! Keys are `tenant \0 component [\0 component]` byte strings. Tenant ids
//! reject NUL at config parse time and scratchpad/cell ids are restricted to
//! `[A-Za-z0-9_-]`, so the separator is unambiguous. RocksDB orders keys
//! lexicographically, which makes tenant-prefix iteration both the tenant
//! index and a scratch_id-sorted scan.

pub const KEY_SEP: u8 = 0;

pub fn tenant_prefix(tenant: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(tenant.len() + 1);
    key.extend_from_slice(tenant.as_bytes());
    key.push(KEY_SEP);
    key
}

pub fn pad_key(tenant: &str, scratch_id: &str) -> Vec<u8> {
    let mut key = tenant_prefix(tenant);
    key.extend_from_slice(scratch_id.as_bytes());
    key
}

/// Prefix covering every cell (or embedding row) of a pad.
pub fn pad_scope_prefix(tenant: &str, scratch_id: &str) -> Vec<u8> {
    let mut key = pad_key(tenant, scratch_id);
    key.push(KEY_SEP);
    key
}

pub fn cell_key(tenant: &str, scratch_id: &str, cell_id: &str) -> Vec<u8> {
    let mut key = pad_scope_prefix(tenant, scratch_id);
    key.extend_from_slice(cell_id.as_bytes());
    key
}

pub fn namespace_key(tenant: &str, namespace: &str) -> Vec<u8> {
    let mut key = tenant_prefix(tenant);
    key.extend_from_slice(namespace.as_bytes());
    key
}

/// Embedding row key; `None` addresses the pad-level document.
pub fn embedding_key(tenant: &str, scratch_id: &str, cell_id: Option<&str>) -> Vec<u8> {
    let mut key = pad_scope_prefix(tenant, scratch_id);
    if let Some(cell_id) = cell_id {
        key.extend_from_slice(cell_id.as_bytes());
    }
    key
}

/// True when `key` begins with `prefix`; used to bound prefix iterations.
pub fn has_prefix(key: &[u8], prefix: &[u8]) -> bool {
    key.len() >= prefix.len() && &key[..prefix.len()] == prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_keys_sort_by_scratch_id_within_tenant() {
        let a = pad_key("t1", "aaa");
        let b = pad_key("t1", "bbb");
        let other = pad_key("t2", "aaa");
        assert!(a < b);
        assert!(b < other);
    }

    #[test]
    fn tenant_prefix_does_not_cross_tenants() {
        let prefix = tenant_prefix("t1");
        assert!(has_prefix(&pad_key("t1", "x"), &prefix));
        assert!(!has_prefix(&pad_key("t10", "x"), &prefix));
        assert!(!has_prefix(&pad_key("t2", "x"), &prefix));
    }

    #[test]
    fn pad_scope_prefix_isolates_sibling_pads() {
        let prefix = pad_scope_prefix("t", "pad");
        assert!(has_prefix(&cell_key("t", "pad", "c1"), &prefix));
        assert!(!has_prefix(&cell_key("t", "pad2", "c1"), &prefix));
        // the pad row itself is not inside the scope prefix
        assert!(!has_prefix(&pad_key("t", "pad"), &prefix));
    }

    #[test]
    fn pad_level_embedding_key_is_scope_prefix() {
        assert_eq!(
            embedding_key("t", "pad", None),
            pad_scope_prefix("t", "pad")
        );
        assert!(embedding_key("t", "pad", Some("c")) > embedding_key("t", "pad", None));
    }
}
