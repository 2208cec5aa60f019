//! Blueprint library and template rendering
//!
//! Blueprints are installable card/page templates with `$token$`
//! placeholders. The library stores them by name; the template module fills
//! the placeholders with live data.

pub mod library;
pub mod schema;
pub mod template;

pub use library::{BlueprintLibrary, InstallOutcome};
pub use schema::{BlueprintDocument, BlueprintInput, BlueprintMeta, BlueprintType};
pub use template::{TemplateContext, render, render_stored};
