// Transport seam: what the session needs from a BLE central stack

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// A peripheral sighting reported during scanning. Sightings may repeat;
/// deduplication happens in the scanner, keyed by `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub identifier: String,
    pub address: String,
    pub connectable: bool,
}

/// Snapshot of one GATT service and its characteristics. Valid only for the
/// connection it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub uuid: String,
    pub characteristics: Vec<CharacteristicInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: String,
    pub can_notify: bool,
    pub can_indicate: bool,
}

/// How a subscription is established. Indications are acknowledged at the
/// link layer; notifications are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeMode {
    Indicate,
    Notify,
}

impl SubscribeMode {
    /// User-facing label for the active stream.
    pub fn label(self) -> &'static str {
        match self {
            Self::Indicate => "Indication",
            Self::Notify => "Notification",
        }
    }
}

impl fmt::Display for SubscribeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indicate => f.write_str("indicate"),
            Self::Notify => f.write_str("notify"),
        }
    }
}

/// The BLE central operations this tool relies on. Events originating on the
/// stack's own threads (scan sightings, payload frames) are delivered over
/// unbounded channels instead of ad hoc callbacks.
#[async_trait]
pub trait BleCentral: Send + Sync {
    /// Run discovery for `timeout`, pushing every sighting into `found`.
    /// Returns once the timeout elapses; dropping the sender marks the end
    /// of the event stream.
    async fn scan(
        &self,
        timeout: Duration,
        found: mpsc::UnboundedSender<DiscoveredDevice>,
    ) -> Result<(), TransportError>;

    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    async fn disconnect(&self, address: &str) -> Result<(), TransportError>;

    async fn services(&self, address: &str) -> Result<Vec<ServiceInfo>, TransportError>;

    /// Establish the single supported subscription; frames are delivered on
    /// `payloads` until unsubscribe or disconnect.
    async fn subscribe(
        &self,
        address: &str,
        service_uuid: &str,
        characteristic_uuid: &str,
        mode: SubscribeMode,
        payloads: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(), TransportError>;

    async fn unsubscribe(
        &self,
        address: &str,
        service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Result<(), TransportError>;
}
