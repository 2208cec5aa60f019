//! Client-local view preferences
//!
//! Grouping toggles belong to one client, not to the shared configuration
//! document. Each grouping axis has its own flag and they are never read in
//! place of one another.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::store::DocumentStore;
use crate::constants::config as paths;

/// The two grouping axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingAxis {
    /// Entity listings (area pages, device pages, favorites)
    EntityListing,
    /// Area overview, grouped by floor
    AreaOverview,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPreferences {
    #[serde(default)]
    pub group_entities: bool,
    #[serde(default)]
    pub group_areas_by_floor: bool,
}

impl ViewPreferences {
    pub fn grouped(&self, axis: GroupingAxis) -> bool {
        match axis {
            GroupingAxis::EntityListing => self.group_entities,
            GroupingAxis::AreaOverview => self.group_areas_by_floor,
        }
    }

    pub fn set_grouped(&mut self, axis: GroupingAxis, grouped: bool) {
        match axis {
            GroupingAxis::EntityListing => self.group_entities = grouped,
            GroupingAxis::AreaOverview => self.group_areas_by_floor = grouped,
        }
    }

    pub fn load(store: &dyn DocumentStore) -> Result<Self> {
        match store
            .load(paths::PREFERENCES_KEY)
            .context("Failed to read view preferences")?
        {
            Some(value) => serde_json::from_value(value).context("Failed to parse view preferences"),
            None => {
                info!("No view preferences stored, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, store: &dyn DocumentStore) -> Result<()> {
        let value = serde_json::to_value(self).context("Failed to serialize view preferences")?;
        store
            .save(paths::PREFERENCES_KEY, &value)
            .context("Failed to write view preferences")
    }
}
