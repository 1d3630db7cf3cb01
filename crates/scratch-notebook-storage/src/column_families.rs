//! Column family definitions for the catalog.
//!
//! # Column Families (4 total)
//! | Name | Key Format | Value |
//! |------|------------|-------|
//! | pads | tenant \0 scratch_id | PadRecord (JSON) |
//! | cells | tenant \0 scratch_id \0 cell_id | ScratchCell (JSON) |
//! | namespaces | tenant \0 namespace | NamespaceRecord (JSON) |
//! | embeddings | tenant \0 scratch_id \0 cell_id? | EmbeddingRecord (JSON) |
//!
//! Every key starts with the tenant id, so a bounded prefix iteration over
//! `tenant\0` doubles as the secondary tenant index required for startup
//! migration and tenant-scoped listings.

use rocksdb::{BlockBasedOptions, Cache, ColumnFamilyDescriptor, Options};

/// Pad rows: one per `(tenant, scratch_id)`.
pub const CF_PADS: &str = "pads";

/// Cell rows: one per `(tenant, scratch_id, cell_id)`.
pub const CF_CELLS: &str = "cells";

/// Namespace registry rows; namespaces exist independently of pads.
pub const CF_NAMESPACES: &str = "namespaces";

/// Embedding rows: pad-level document (empty cell component) plus one row
/// per cell.
pub const CF_EMBEDDINGS: &str = "embeddings";

/// All catalog column family names.
pub const ALL_CFS: &[&str] = &[CF_PADS, CF_CELLS, CF_NAMESPACES, CF_EMBEDDINGS];

/// Options for point-lookup-heavy row storage (pads, namespaces).
fn row_cf_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_bloom_filter(10.0, false);
    block_opts.set_cache_index_and_filter_blocks(true);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);
    opts
}

/// Options for scan-heavy storage (cells, embeddings).
fn scan_cf_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_cache_index_and_filter_blocks(true);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);
    opts
}

/// Descriptors for all catalog column families sharing one block cache.
pub fn get_cf_descriptors(cache: &Cache) -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_PADS, row_cf_options(cache)),
        ColumnFamilyDescriptor::new(CF_CELLS, scan_cf_options(cache)),
        ColumnFamilyDescriptor::new(CF_NAMESPACES, row_cf_options(cache)),
        ColumnFamilyDescriptor::new(CF_EMBEDDINGS, scan_cf_options(cache)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cf_names_unique_and_snake_case() {
        let set: std::collections::HashSet<_> = ALL_CFS.iter().collect();
        assert_eq!(set.len(), ALL_CFS.len());
        for name in ALL_CFS {
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn descriptors_cover_all_cfs() {
        let cache = Cache::new_lru_cache(8 * 1024 * 1024);
        let descriptors = get_cf_descriptors(&cache);
        let names: Vec<_> = descriptors.iter().map(|d| d.name()).collect();
        for name in ALL_CFS {
            assert!(names.contains(name), "missing CF: {name}");
        }
    }
}
