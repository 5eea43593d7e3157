//! NATS transport for sync events.
//!
//! Each event kind is published on its own subject below the configured
//! prefix (`tic_tac_toe.join`, `tic_tac_toe.move`, ...). Subscribers listen
//! on `{prefix}.*` and decode the JSON body of every message.

use async_trait::async_trait;
use futures::StreamExt;
use tictac_types::SyncEvent;
use tracing::{debug, info, warn};

use crate::error::BusError;
use crate::{SyncBus, SyncStream};

/// NATS-backed [`SyncBus`].
pub struct NatsBus {
    client: async_nats::Client,
    prefix: String,
}

impl NatsBus {
    /// Connect to a NATS server and publish below `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, BusError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self {
            client,
            prefix: prefix.into(),
        })
    }

    /// The wildcard subject covering every channel.
    pub fn wildcard(&self) -> String {
        format!("{}.*", self.prefix)
    }

    /// The subject `event` is published on.
    pub fn subject_for(&self, event: &SyncEvent) -> String {
        event.channel().name(&self.prefix)
    }
}

/// Decode one bus message. Bad payloads are logged and dropped.
pub fn decode(subject: &str, payload: &[u8]) -> Option<SyncEvent> {
    match serde_json::from_slice::<SyncEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(subject = subject, error = %e, "dropping undecodable sync event");
            None
        }
    }
}

#[async_trait]
impl SyncBus for NatsBus {
    async fn publish(&self, event: &SyncEvent) -> Result<(), BusError> {
        let subject = self.subject_for(event);
        let payload = serde_json::to_vec(event)?;
        debug!(
            subject = subject,
            kind = event.payload.kind(),
            "publishing sync event"
        );
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| BusError::Nats(format!("failed to publish to {subject}: {e}")))?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<SyncStream, BusError> {
        let subject = self.wildcard();
        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .map_err(|e| BusError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
        info!(subject = subject, "subscribed to sync channels");

        let stream = subscriber.filter_map(|message| {
            futures::future::ready(decode(message.subject.as_str(), &message.payload))
        });
        Ok(stream.boxed())
    }
}

impl std::fmt::Debug for NatsBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsBus")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
