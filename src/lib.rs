#![forbid(unsafe_code)]

pub mod blueprint;
pub mod config;
pub mod constants;
pub mod domain;
pub mod engine;
pub mod error;
pub mod event_handler;
pub mod ipc;
pub mod ordering;
pub mod registry;
pub mod reorder;
pub mod resolver;
pub mod visibility;

pub use engine::{Dashboard, Engine, ResolvedView, View};
pub use error::{EngineError, Result};
