// Peripheral session lifecycle: connect, discover, subscribe, stream,
// tear down

use std::future::Future;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::error::Error;
use crate::sink::PayloadSink;
use crate::transport::{BleCentral, DiscoveredDevice, ServiceInfo, SubscribeMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connected,
    ServicesDiscovered,
    CharacteristicFound,
    Subscribed,
    Unsubscribing,
    Disconnected,
}

#[derive(Debug, Clone)]
struct Subscription {
    service_uuid: String,
    characteristic_uuid: String,
    mode: SubscribeMode,
}

/// One connection to one panel. Whatever happens after `connect` succeeds,
/// the session ends in `Disconnected`: teardown cancels an established
/// subscription (tolerating failure) and always issues the disconnect.
pub struct Session<'a, T: BleCentral + ?Sized> {
    transport: &'a T,
    device: DiscoveredDevice,
    target_uuid: String,
    state: SessionState,
    subscription: Option<Subscription>,
}

impl<'a, T: BleCentral + ?Sized> Session<'a, T> {
    pub fn new(transport: &'a T, device: DiscoveredDevice, characteristic_uuid: &str) -> Self {
        Self {
            transport,
            device,
            target_uuid: characteristic_uuid.to_ascii_lowercase(),
            state: SessionState::Idle,
            subscription: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the whole lifecycle. `stop` ends the streaming phase.
    pub async fn run<F>(&mut self, sink: &mut dyn PayloadSink, stop: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        self.transport
            .connect(&self.device.address)
            .await
            .map_err(Error::ConnectionFailed)?;
        self.state = SessionState::Connected;
        debug!("Connected to {}", self.device.address);

        let result = self.drive(sink, stop).await;
        self.teardown().await;
        result
    }

    async fn drive<F>(&mut self, sink: &mut dyn PayloadSink, stop: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let services = self
            .transport
            .services(&self.device.address)
            .await
            .map_err(Error::ServiceDiscoveryFailed)?;
        self.state = SessionState::ServicesDiscovered;
        debug!("Discovered {} services", services.len());

        let (service_uuid, characteristic_uuid) = self.find_characteristic(&services)?;
        let mode = self.pick_mode(&services, &service_uuid, &characteristic_uuid)?;
        let mut payloads = self
            .establish(service_uuid, characteristic_uuid.clone(), mode)
            .await?;

        println!(
            "{} active on characteristic {}. Press Enter to stop...",
            mode.label(),
            characteristic_uuid
        );
        self.stream(&mut payloads, sink, stop).await;
        Ok(())
    }

    /// Linear search in discovery order; the first match is authoritative.
    fn find_characteristic(&mut self, services: &[ServiceInfo]) -> Result<(String, String), Error> {
        for service in services {
            for characteristic in &service.characteristics {
                if characteristic.uuid.to_ascii_lowercase() == self.target_uuid {
                    debug!(
                        "Matched characteristic {} in service {}",
                        characteristic.uuid, service.uuid
                    );
                    self.state = SessionState::CharacteristicFound;
                    return Ok((service.uuid.clone(), characteristic.uuid.clone()));
                }
            }
        }

        warn!(
            "Characteristic {} not found on {}; discovered attributes:",
            self.target_uuid, self.device.address
        );
        for service in services {
            for characteristic in &service.characteristics {
                warn!(
                    "  {} / {} notify={} indicate={}",
                    service.uuid,
                    characteristic.uuid,
                    characteristic.can_notify,
                    characteristic.can_indicate
                );
            }
        }
        Err(Error::CharacteristicNotFound {
            uuid: self.target_uuid.clone(),
        })
    }

    /// Re-derive capability flags from the discovered snapshot, then pick
    /// the mode. Indications take precedence over notifications.
    fn pick_mode(
        &self,
        services: &[ServiceInfo],
        service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Result<SubscribeMode, Error> {
        let mut can_indicate = false;
        let mut can_notify = false;
        for service in services {
            if !service.uuid.eq_ignore_ascii_case(service_uuid) {
                continue;
            }
            for characteristic in &service.characteristics {
                if !characteristic.uuid.eq_ignore_ascii_case(characteristic_uuid) {
                    continue;
                }
                can_indicate = characteristic.can_indicate;
                can_notify = characteristic.can_notify;
                break;
            }
        }

        if can_indicate {
            Ok(SubscribeMode::Indicate)
        } else if can_notify {
            Ok(SubscribeMode::Notify)
        } else {
            Err(Error::UnsupportedCharacteristic)
        }
    }

    async fn establish(
        &mut self,
        service_uuid: String,
        characteristic_uuid: String,
        mode: SubscribeMode,
    ) -> Result<mpsc::UnboundedReceiver<Vec<u8>>, Error> {
        let (payload_tx, payload_rx) = mpsc::unbounded_channel();
        self.transport
            .subscribe(
                &self.device.address,
                &service_uuid,
                &characteristic_uuid,
                mode,
                payload_tx,
            )
            .await
            .map_err(Error::SubscriptionFailed)?;

        self.subscription = Some(Subscription {
            service_uuid,
            characteristic_uuid,
            mode,
        });
        self.state = SessionState::Subscribed;
        Ok(payload_rx)
    }

    /// Forward frames to the sink until the stop signal fires. Frame
    /// delivery and the stop wait share one `select!`, so neither can
    /// starve the other.
    async fn stream<F>(
        &mut self,
        payloads: &mut mpsc::UnboundedReceiver<Vec<u8>>,
        sink: &mut dyn PayloadSink,
        stop: F,
    ) where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);
        loop {
            tokio::select! {
                () = &mut stop => break,
                frame = payloads.recv() => match frame {
                    Some(bytes) => sink.on_payload(&bytes),
                    None => {
                        warn!("Payload stream closed by transport");
                        break;
                    }
                },
            }
        }
    }

    async fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.state = SessionState::Unsubscribing;
            debug!(
                "Cancelling {} stream on {}",
                subscription.mode, subscription.characteristic_uuid
            );
            if let Err(err) = self
                .transport
                .unsubscribe(
                    &self.device.address,
                    &subscription.service_uuid,
                    &subscription.characteristic_uuid,
                )
                .await
            {
                warn!("Unsubscribe failed (continuing): {}", err);
            }
        }

        if let Err(err) = self.transport.disconnect(&self.device.address).await {
            warn!("Disconnect failed: {}", err);
        }
        self.state = SessionState::Disconnected;
        info!("Disconnected from {}", self.device.address);
    }
}
