//! Schema registration and discovery.
//!
//! Extraction schemas are registered under an explicit format name (for
//! example `"onix3-books"` or `"crossref-json"`) and looked up by that name
//! when a batch names the format a delivery file uses. Registration is the
//! only way a schema becomes reachable; nothing is discovered implicitly.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::{HarvestError, Result};
use crate::schema::SourceSchema;

/// Validate a format name before registration.
///
/// # Rules
///
/// - Name cannot be empty
/// - Name cannot contain whitespace
///
/// # Errors
///
/// Returns `Validation` if the name is invalid.
fn validate_format_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(HarvestError::validation("Format name cannot be empty"));
    }

    if name.contains(char::is_whitespace) {
        return Err(HarvestError::validation(format!(
            "Format name '{}' cannot contain whitespace",
            name
        )));
    }

    Ok(())
}

/// Registry of extraction schemas keyed by format name.
///
/// # Thread Safety
///
/// Schemas are stored behind `Arc` and handed out by clone, so lookups never
/// hold the registry lock while a document is being processed.
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<SourceSchema>>,
}

impl SchemaRegistry {
    /// Create a new empty schema registry.
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Register `schema` under `format`, replacing any previous registration
    /// for that name.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the format name is empty or contains
    /// whitespace.
    pub fn register(
        &mut self,
        format: impl Into<String>,
        schema: impl Into<Arc<SourceSchema>>,
    ) -> Result<()> {
        let format = format.into();
        validate_format_name(&format)?;
        if self.schemas.insert(format.clone(), schema.into()).is_some() {
            debug!(format = format.as_str(), "replaced registered schema");
        }
        Ok(())
    }

    /// Look up the schema registered under `format`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaNotFound` if no schema is registered under that name.
    pub fn get(&self, format: &str) -> Result<Arc<SourceSchema>> {
        self.schemas
            .get(format)
            .cloned()
            .ok_or_else(|| HarvestError::SchemaNotFound(format.to_string()))
    }

    /// Remove the schema registered under `format`, returning it if present.
    pub fn remove(&mut self, format: &str) -> Option<Arc<SourceSchema>> {
        self.schemas.remove(format)
    }

    /// Registered format names, sorted.
    pub fn list_formats(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global schema registry singleton.
pub static SCHEMA_REGISTRY: Lazy<Arc<RwLock<SchemaRegistry>>> =
    Lazy::new(|| Arc::new(RwLock::new(SchemaRegistry::new())));

/// Get the global schema registry.
pub fn schema_registry() -> Arc<RwLock<SchemaRegistry>> {
    SCHEMA_REGISTRY.clone()
}
