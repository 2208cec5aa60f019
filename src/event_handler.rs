//! Reload signal handling
//!
//! The store broadcasts a signal after every successful write; the host
//! broadcasts registry and state changes. Handlers never look at the payload:
//! any signal re-fetches the full registry and configuration and re-runs one
//! resolution pass.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::config::ViewPreferences;
use crate::constants::channels;
use crate::engine::{Dashboard, Engine, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadSignal {
    ConfigurationUpdated,
    BlueprintsUpdated,
    RegistryUpdated,
    StateChanged,
}

pub fn signal_channel() -> (broadcast::Sender<ReloadSignal>, broadcast::Receiver<ReloadSignal>) {
    broadcast::channel(channels::SIGNAL_CAPACITY)
}

/// Run one resolution pass and publish it unless a newer pass won
pub fn handle_signal(
    signal: ReloadSignal,
    engine: &Engine,
    dashboard: &mut Dashboard,
    view: &View,
    preferences: &ViewPreferences,
) -> bool {
    let generation = dashboard.begin_pass();
    debug!(signal = ?signal, generation, "Re-running resolution");
    let resolved = engine.resolve(view, preferences);
    dashboard.publish(generation, resolved)
}

/// Call `on_signal` for every signal until all senders are gone.
/// A lagging receiver still re-runs once, since only the latest state matters.
pub async fn run_reload_loop(mut signals: broadcast::Receiver<ReloadSignal>, mut on_signal: impl FnMut(ReloadSignal)) {
    info!("Reload loop started");
    loop {
        match signals.recv().await {
            Ok(signal) => on_signal(signal),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Reload signals dropped, re-running once");
                on_signal(ReloadSignal::ConfigurationUpdated);
            }
            Err(RecvError::Closed) => break,
        }
    }
    info!("Reload loop stopped");
}
