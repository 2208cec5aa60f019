//! Blueprint document types.
//!
//! A blueprint is a user-supplied, versioned card or page template with a
//! declared input schema:
//!
//! ```json
//! {
//!   "blueprint": {"name": "...", "version": "1.0", "type": "replace-card",
//!                 "input": {"icon": {"name": "Icon"}}},
//!   "card": {"type": "tile", "entity": "$replace_with_input_entity$", "icon": "$icon$"}
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::template;
use crate::error::{EngineError, Result};

/// What a blueprint produces when used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlueprintType {
    /// A new card placed on an area page
    Card,
    /// Replaces the card or popup of an entity or domain
    ReplaceCard,
    /// A whole extra page
    Page,
}

impl fmt::Display for BlueprintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlueprintType::Card => write!(f, "card"),
            BlueprintType::ReplaceCard => write!(f, "replace-card"),
            BlueprintType::Page => write!(f, "page"),
        }
    }
}

/// One declared input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Free-form selector hint for the editing UI (`entity`, `icon`, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintMeta {
    pub name: String,
    /// Accepts `1.2` as well as `"1.2"`
    #[serde(deserialize_with = "deserialize_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: BlueprintType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input: BTreeMap<String, BlueprintInput>,
    /// Custom card elements the template depends on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_cards: Vec<String>,
}

/// Custom deserializer that accepts both string and number versions
fn deserialize_version<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(serde_json::Number),
    }

    match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(s) => Ok(s),
        TextOrNumber::Number(n) => Ok(n.to_string()),
    }
}

/// Complete installable blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintDocument {
    pub blueprint: BlueprintMeta,
    /// Template with `$token$` placeholders; a JSON string holds template text
    pub card: serde_json::Value,
}

impl BlueprintDocument {
    pub fn name(&self) -> &str {
        &self.blueprint.name
    }

    pub fn kind(&self) -> BlueprintType {
        self.blueprint.kind
    }

    /// Reject documents that could never be installed
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.blueprint.name.trim().is_empty() {
            errors.push("name is empty".to_string());
        }
        if self.blueprint.version.trim().is_empty() {
            errors.push("version is empty".to_string());
        }
        for key in self.blueprint.input.keys() {
            if !template::is_identifier(key) {
                errors.push(format!("input key '{key}' is not a valid token identifier"));
            }
        }
        if self.card.is_null() {
            errors.push("card template is missing".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::InvalidBlueprint {
                name: self.blueprint.name.clone(),
                reason: errors.join(", "),
            })
        }
    }

    /// Tokens the template references that are neither reserved nor declared inputs
    pub fn undeclared_tokens(&self) -> Vec<String> {
        template::referenced_tokens(&self.card)
            .into_iter()
            .filter(|token| !template::is_reserved(token) && !self.blueprint.input.contains_key(token))
            .collect()
    }
}
