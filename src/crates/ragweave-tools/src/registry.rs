//! Tool registry: the catalog of callable capabilities
//!
//! One registry is constructed per process and passed by reference into
//! the engine (explicit dependency injection, no process-wide singleton),
//! which keeps tests free to build throwaway registries with fakes.

use crate::definition::ToolDefinition;
use std::collections::HashMap;
use std::sync::Arc;

/// Catalog of named, schema-validated tools
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<ToolDefinition>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any existing definition with the same name
    pub fn register(&mut self, definition: ToolDefinition) {
        self.tools
            .insert(definition.name.clone(), Arc::new(definition));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool is registered under `name`
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Remove a tool, reporting whether it existed
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// All tools in the given category
    pub fn list_by_category(&self, category: &str) -> Vec<Arc<ToolDefinition>> {
        let mut matched: Vec<_> = self
            .tools
            .values()
            .filter(|t| t.category == category)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name));
        matched
    }

    /// All registered tool names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render the natural-language tool catalog for the reasoning step
    ///
    /// Deterministic ordering so the same registry always produces the
    /// same prompt text.
    pub fn catalog(&self) -> String {
        self.names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.catalog_entry())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ToolHandler, ToolParameter};
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct NoopHandler;

    #[async_trait]
    impl ToolHandler for NoopHandler {
        async fn run(&self, _input: Value) -> Result<Value> {
            Ok(json!(null))
        }
    }

    fn tool(name: &str, category: &str) -> ToolDefinition {
        ToolDefinition::builder(name, format!("{} tool", name))
            .category(category)
            .parameter(ToolParameter::string("query", true))
            .handler(NoopHandler)
            .build()
    }

    #[test]
    fn test_register_get_has() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("search", "retrieval"));

        assert!(registry.has("search"));
        assert!(registry.get("search").is_some());
        assert!(!registry.has("missing"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_unregister() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("search", "retrieval"));

        assert!(registry.unregister("search"));
        assert!(!registry.unregister("search"));
        assert!(!registry.has("search"));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("search", "retrieval"));
        registry.register(tool("search", "lookup"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("search").unwrap().category, "lookup");
    }

    #[test]
    fn test_list_by_category() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("web_search", "retrieval"));
        registry.register(tool("doc_search", "retrieval"));
        registry.register(tool("add", "calculation"));

        let retrieval = registry.list_by_category("retrieval");
        assert_eq!(retrieval.len(), 2);
        assert_eq!(retrieval[0].name, "doc_search");
        assert_eq!(retrieval[1].name, "web_search");

        assert!(registry.list_by_category("nonexistent").is_empty());
    }

    #[test]
    fn test_catalog_is_deterministic() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("beta", "x"));
        registry.register(tool("alpha", "x"));

        let catalog = registry.catalog();
        let alpha_pos = catalog.find("alpha").unwrap();
        let beta_pos = catalog.find("beta").unwrap();
        assert!(alpha_pos < beta_pos);
    }
}
