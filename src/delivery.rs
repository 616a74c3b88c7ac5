//! Delivery collaborator
//!
//! Hands already-sealed payloads to other devices. A [`Delivery`] has no
//! field that could carry a passphrase or a key.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::crypto::SealedPayload;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub room_id: Uuid,
    pub sender: String,
    pub payload: SealedPayload,
}

pub trait DeliveryChannel: Send + Sync {
    fn deliver(&self, delivery: &Delivery) -> Result<()>;
}

/// Drops everything. For offline use and the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelivery;

impl DeliveryChannel for NoDelivery {
    fn deliver(&self, _delivery: &Delivery) -> Result<()> {
        Ok(())
    }
}

/// Fan-out to in-process subscribers over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastDelivery {
    tx: broadcast::Sender<Delivery>,
}

impl BroadcastDelivery {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Delivery> {
        self.tx.subscribe()
    }
}

impl DeliveryChannel for BroadcastDelivery {
    fn deliver(&self, delivery: &Delivery) -> Result<()> {
        // No subscribers just means nobody else is online.
        if let Ok(receivers) = self.tx.send(delivery.clone()) {
            tracing::trace!(room_id = %delivery.room_id, receivers, "payload delivered");
        }
        Ok(())
    }
}
