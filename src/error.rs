// Error types for the panel link

use thiserror::Error;

/// Failures reported by a [`crate::transport::BleCentral`] implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("bluetooth failure: {0}")]
    Bluetooth(#[from] bluer::Error),

    #[error("no Bluetooth adapters present")]
    NoAdapter,

    #[error("invalid device address: {0}")]
    InvalidAddress(String),

    #[error("attribute {0} not present on the connected device")]
    AttributeMissing(String),

    #[error("no active subscription")]
    NotSubscribed,

    #[error("a subscription is already active")]
    AlreadySubscribed,

    /// Failure injected by the test transport.
    #[cfg(test)]
    #[error("{0}")]
    Injected(&'static str),
}

/// Fatal errors of the end-to-end flow. Every variant terminates the run
/// with a non-zero exit; causes are attached as sources so the binary edge
/// can print the full chain.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no usable Bluetooth adapter found")]
    AdapterNotFound(#[source] TransportError),

    #[error("device scan failed")]
    ScanFailed(#[source] TransportError),

    #[error("no connectable peripherals discovered")]
    NoConnectablePeripherals,

    #[error("no {identifier} devices found")]
    NoTargetDeviceFound { identifier: String },

    #[error("invalid device selection")]
    InvalidSelection,

    #[error("connection failed")]
    ConnectionFailed(#[source] TransportError),

    #[error("service discovery failed")]
    ServiceDiscoveryFailed(#[source] TransportError),

    #[error("characteristic {uuid} not found on selected device")]
    CharacteristicNotFound { uuid: String },

    #[error("characteristic supports neither indicate nor notify")]
    UnsupportedCharacteristic,

    #[error("subscription failed")]
    SubscriptionFailed(#[source] TransportError),
}
