//! MCP tool registry.

mod definitions;
mod types;

pub use types::ToolDefinition;

/// Tool name constants, used by the registry and the dispatcher.
pub mod names {
    pub const SCRATCH_CREATE: &str = "scratch_create";
    pub const SCRATCH_READ: &str = "scratch_read";
    pub const SCRATCH_LIST: &str = "scratch_list";
    pub const SCRATCH_LIST_CELLS: &str = "scratch_list_cells";
    pub const SCRATCH_APPEND_CELL: &str = "scratch_append_cell";
    pub const SCRATCH_REPLACE_CELL: &str = "scratch_replace_cell";
    pub const SCRATCH_DELETE: &str = "scratch_delete";
    pub const SCRATCH_VALIDATE: &str = "scratch_validate";
    pub const SCRATCH_SEARCH: &str = "scratch_search";
    pub const SCRATCH_LIST_TAGS: &str = "scratch_list_tags";
    pub const SCRATCH_UPSERT_SCHEMA: &str = "scratch_upsert_schema";
    pub const SCRATCH_GET_SCHEMA: &str = "scratch_get_schema";
    pub const SCRATCH_LIST_SCHEMAS: &str = "scratch_list_schemas";
    pub const SCRATCH_NAMESPACE_LIST: &str = "scratch_namespace_list";
    pub const SCRATCH_NAMESPACE_CREATE: &str = "scratch_namespace_create";
    pub const SCRATCH_NAMESPACE_RENAME: &str = "scratch_namespace_rename";
    pub const SCRATCH_NAMESPACE_DELETE: &str = "scratch_namespace_delete";
}

/// All tool definitions exposed through `tools/list`.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    definitions::definitions()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_all_seventeen_tools() {
        let definitions = get_tool_definitions();
        assert_eq!(definitions.len(), 17);
    }

    #[test]
    fn tool_names_are_unique_and_prefixed() {
        let definitions = get_tool_definitions();
        let names: std::collections::HashSet<_> =
            definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.len(), definitions.len());
        for name in names {
            assert!(name.starts_with("scratch_"), "unexpected tool name: {name}");
        }
    }

    #[test]
    fn every_input_schema_is_an_object_schema() {
        for definition in get_tool_definitions() {
            assert_eq!(definition.input_schema["type"], "object", "{}", definition.name);
        }
    }
}
