//! In-process mutation channel
//!
//! Provides request/response communication between the dashboard and the
//! configuration store. Requests travel over a bounded tokio mpsc channel
//! together with a oneshot sender for the reply; one handler task owns every
//! write to the configuration document.

use anyhow::{Context, Result, anyhow};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::constants::channels;

pub mod handler;
pub mod messages;
pub use messages::{
    ButtonKind, ButtonSettings, ButtonTarget, CardTarget, ConfigRequest, ConfigResponse, EntityFlags,
};

/// One request plus the slot its reply goes into
#[derive(Debug)]
pub struct Envelope {
    pub request: ConfigRequest,
    pub reply: oneshot::Sender<ConfigResponse>,
}

/// Create a connected client and the receiver the handler task drains
pub fn channel() -> (ConfigClient, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(channels::REQUEST_CAPACITY);
    (ConfigClient { tx }, rx)
}

/// Sending side of the mutation channel (used by the dashboard)
#[derive(Clone)]
pub struct ConfigClient {
    tx: mpsc::Sender<Envelope>,
}

impl ConfigClient {
    /// Send request and wait for the response
    pub async fn request(&self, request: ConfigRequest) -> Result<ConfigResponse> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| anyhow!("Configuration handler is not running"))?;
        response
            .await
            .context("Configuration handler dropped the request without replying")
    }

    /// Send request without waiting. Failures are only logged; the next
    /// reload signal shows whatever the store actually holds.
    pub fn submit(&self, request: ConfigRequest) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let verb = request.verb();
            match client.request(request).await {
                Ok(ConfigResponse::Error(message)) => warn!(verb, error = %message, "Mutation rejected"),
                Ok(_) => debug!(verb, "Mutation acknowledged"),
                Err(e) => error!(verb, error = ?e, "Mutation could not be delivered"),
            }
        })
    }
}
