//! Application-wide constants
//!
//! This module contains the magic numbers and string literals used throughout
//! the engine, providing a single source of truth for constant values.

/// Sort order constants
pub mod sorting {
    /// Sort value used when no order was ever persisted (lowest priority)
    pub const DEFAULT_SORT_ORDER: u32 = 99;
}

/// Card span constants (row/column units of the responsive grid)
pub mod spans {
    /// Span used when neither an override nor a domain default applies
    pub const DEFAULT_SPAN: u8 = 1;

    /// Camera cards occupy a 2x2 block at every breakpoint
    pub const CAMERA_SPAN: u8 = 2;

    /// Smallest span accepted from the configuration document
    pub const MIN_SPAN: u8 = 1;

    /// Largest span accepted from the configuration document
    pub const MAX_SPAN: u8 = 4;
}

/// Built-in card element names
pub mod cards {
    pub const LIGHT_CARD: &str = "custom:cardsmith-light-card";
    pub const CLIMATE_CARD: &str = "custom:cardsmith-thermostat-card";
    pub const COVER_CARD: &str = "custom:cardsmith-cover-card";
    pub const ENTITY_CARD: &str = "custom:cardsmith-entity-card";
    pub const CAMERA_CARD: &str = "picture-entity";

    pub const LIGHT_POPUP: &str = "custom:cardsmith-light-popup";
    pub const CLIMATE_POPUP: &str = "custom:cardsmith-thermostat-popup";
    pub const COVER_POPUP: &str = "custom:cardsmith-cover-popup";
    pub const CAMERA_POPUP: &str = "custom:cardsmith-camera-popup";
    pub const ENTITY_POPUP: &str = "custom:cardsmith-more-info-popup";

    pub const AREA_BUTTON: &str = "custom:cardsmith-area-button";
    pub const DEVICE_BUTTON: &str = "custom:cardsmith-device-button";

    /// Area button icon when the area has none configured
    pub const AREA_ICON: &str = "mdi:texture-box";

    /// Placeholder rendered when a single card fails to resolve
    pub const ERROR_CARD: &str = "error";

    /// Camera cards stream live video instead of polling snapshots
    pub const CAMERA_VIEW_LIVE: &str = "live";
}

/// Blueprint template tokens
pub mod tokens {
    /// Delimiter around token identifiers (`$name$`)
    pub const DELIMITER: char = '$';

    /// Resolves to the entity the card is rendered for
    pub const INPUT_ENTITY: &str = "replace_with_input_entity";

    /// Resolves to the display name of that entity
    pub const INPUT_NAME: &str = "replace_with_input_name";

    /// Input keys merged into every blueprint substitution
    pub const INPUT_ENTITY_KEY: &str = "input_entity";
    pub const INPUT_NAME_KEY: &str = "input_name";
}

/// Group keys that are not derived from the registry
pub mod groups {
    /// Group holding user-added slot cards on an area page
    pub const CUSTOM_SLOTS: &str = "custom";

    /// Prefix of slot card target ids (`slot:<area_id>:<card_id>`)
    pub const SLOT_TARGET_PREFIX: &str = "slot:";
}

/// Configuration file locations
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "cardsmith";

    /// Store key of the shared configuration document
    pub const CONFIG_KEY: &str = "config";

    /// Store key of the client-local view preferences
    pub const PREFERENCES_KEY: &str = "preferences";

    /// Extension of documents written by the file store
    pub const FILE_EXTENSION: &str = "json";

    /// Environment variable overriding the config directory
    pub const DIR_ENV: &str = "CARDSMITH_CONFIG_DIR";
}

/// Channel sizing for the mutation and reload pipes
pub mod channels {
    /// Pending mutation requests before senders wait
    pub const REQUEST_CAPACITY: usize = 64;

    /// Reload signals buffered per subscriber
    pub const SIGNAL_CAPACITY: usize = 16;
}
