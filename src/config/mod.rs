//! Configuration management for cardsmith
//!
//! This module provides three pieces:
//! - **document**: the shared ConfigurationDocument every client edits
//! - **preferences**: client-local grouping toggles
//! - **store**: the key-value document store both are persisted through

pub mod document;
pub mod mutations;
pub mod preferences;
pub mod store;

// Re-export commonly used types
pub use document::{
    AreaMeta, CardDocument, ConfigSource, ConfigurationDocument, DomainDefaults, EntityOverride,
    HomepageHeader, MorePage, SlotCard, SortContext, SpanOverride,
};
pub use preferences::{GroupingAxis, ViewPreferences};
pub use store::{DocumentStore, JsonFileStore, MemoryStore, SharedConfig};
