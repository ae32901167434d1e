//! Registry of per-work structure schemas.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{ResolvedSchema, StructureSchema};
use crate::config::CorpusConfig;
use crate::error::Result;

/// Immutable (author, work) → schema table with a typed fallback.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<(String, String), Arc<StructureSchema>>,
    fallback: Arc<StructureSchema>,
}

impl SchemaRegistry {
    /// Create a registry with no registered works.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
            fallback: Arc::new(StructureSchema::fallback()),
        }
    }

    /// Build the registry from the corpus configuration, validating every schema.
    pub fn from_config(config: &CorpusConfig) -> Result<Self> {
        let mut registry = Self::new();
        for entry in &config.schemas {
            registry.register(&entry.author, &entry.work, entry.levels.clone())?;
        }
        Ok(registry)
    }

    /// Register (or replace) the schema of a work.
    pub fn register(&mut self, author_id: &str, work_id: &str, levels: Vec<String>) -> Result<()> {
        let schema = StructureSchema::new(author_id, work_id, levels)?;
        let key = (author_id.to_string(), work_id.to_string());
        if self.schemas.insert(key, Arc::new(schema)).is_some() {
            tracing::warn!(author_id, work_id, "schema registered twice, keeping the last one");
        }
        Ok(())
    }

    /// Builder variant of [`register`](Self::register).
    pub fn with_schema(mut self, author_id: &str, work_id: &str, levels: &[&str]) -> Result<Self> {
        let levels = levels.iter().map(|l| (*l).to_string()).collect();
        self.register(author_id, work_id, levels)?;
        Ok(self)
    }

    /// Resolve the schema of a work.
    #[must_use]
    pub fn resolve(&self, author_id: &str, work_id: &str) -> ResolvedSchema {
        match self
            .schemas
            .get(&(author_id.to_string(), work_id.to_string()))
        {
            Some(schema) => ResolvedSchema::Registered(Arc::clone(schema)),
            None => ResolvedSchema::Fallback(Arc::clone(&self.fallback)),
        }
    }

    /// Number of registered works.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_registered() {
        let registry = SchemaRegistry::new()
            .with_schema("0059", "030", &["book", "section", "line"])
            .unwrap();

        let resolved = registry.resolve("0059", "030");
        assert!(!resolved.is_fallback());
        assert_eq!(resolved.schema().levels(), ["book", "section", "line"]);
    }

    #[test]
    fn test_resolve_fallback() {
        let registry = SchemaRegistry::new();
        let resolved = registry.resolve("0059", "030");
        assert!(resolved.is_fallback());
        assert_eq!(resolved.schema().levels(), ["chapter", "line"]);
    }

    #[test]
    fn test_from_config_rejects_invalid_schema() {
        let config = CorpusConfig::from_yaml_str(
            "schemas:\n  - {author: \"1\", work: \"2\", levels: [line, line]}",
        )
        .unwrap();
        assert!(SchemaRegistry::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config() {
        let config = CorpusConfig::from_yaml_str(
            "schemas:\n  - {author: \"0012\", work: \"001\", levels: [book]}",
        )
        .unwrap();
        let registry = SchemaRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.resolve("0012", "001").schema().levels(),
            ["book", "line"]
        );
    }
}
