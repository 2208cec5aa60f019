//! Installed blueprint library.
//!
//! Blueprints are indexed by name. Installing a blueprint whose name is
//! already present replaces it (an upgrade); deleting removes it and leaves
//! every card that was made from it untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::schema::{BlueprintDocument, BlueprintType};
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    Upgraded { previous_version: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlueprintLibrary {
    blueprints: BTreeMap<String, BlueprintDocument>,
}

impl BlueprintLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, document: BlueprintDocument) -> Result<InstallOutcome> {
        document.validate()?;

        let undeclared = document.undeclared_tokens();
        if !undeclared.is_empty() {
            // Unknown tokens echo their own name at render time
            warn!(blueprint = %document.name(), tokens = ?undeclared, "Template uses undeclared inputs");
        }

        let name = document.name().to_string();
        let version = document.blueprint.version.clone();
        let outcome = match self.blueprints.insert(name.clone(), document) {
            Some(previous) => InstallOutcome::Upgraded {
                previous_version: previous.blueprint.version,
            },
            None => InstallOutcome::Installed,
        };
        info!(blueprint = %name, version = %version, outcome = ?outcome, "Installed blueprint");
        Ok(outcome)
    }

    pub fn delete(&mut self, name: &str) -> Result<BlueprintDocument> {
        let removed = self
            .blueprints
            .remove(name)
            .ok_or_else(|| EngineError::UnknownBlueprint(name.to_string()))?;
        info!(blueprint = %name, "Deleted blueprint");
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> Option<&BlueprintDocument> {
        self.blueprints.get(name)
    }

    /// Look up a blueprint and check it may be used for `expected`
    pub fn require(&self, name: &str, expected: BlueprintType) -> Result<&BlueprintDocument> {
        let document = self
            .get(name)
            .ok_or_else(|| EngineError::UnknownBlueprint(name.to_string()))?;
        if document.kind() != expected {
            return Err(EngineError::BlueprintTypeMismatch {
                name: name.to_string(),
                actual: document.kind().to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(document)
    }

    /// Blueprints in name order
    pub fn iter(&self) -> impl Iterator<Item = &BlueprintDocument> {
        self.blueprints.values()
    }

    pub fn by_type(&self, kind: BlueprintType) -> Vec<&BlueprintDocument> {
        self.iter().filter(|b| b.kind() == kind).collect()
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}
