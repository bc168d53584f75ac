// Bluetooth Low Energy transport using the bluer crate

use std::time::Duration;

use async_trait::async_trait;
use bluer::gatt::remote::Characteristic;
use bluer::{Adapter, AdapterEvent, Address, Device, Session};
use futures::StreamExt;
use log::debug;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::TransportError;
use crate::transport::{
    BleCentral, CharacteristicInfo, DiscoveredDevice, ServiceInfo, SubscribeMode,
};

pub struct BleAdapter {
    adapter: Adapter,
    name: String,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl BleAdapter {
    /// Acquire the named adapter, or the first available one, and power it
    /// on.
    pub async fn new(adapter_name: Option<&str>) -> Result<Self, TransportError> {
        let session = Session::new().await?;
        let adapter = match adapter_name {
            Some(name) => session.adapter(name)?,
            None => {
                let names = session.adapter_names().await?;
                let first = names.first().ok_or(TransportError::NoAdapter)?;
                session.adapter(first)?
            }
        };

        adapter.set_powered(true).await?;

        let name = adapter.name().to_string();
        debug!("Adapter name: {}", name);

        Ok(BleAdapter {
            adapter,
            name,
            subscription: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn device(&self, address: &str) -> Result<Device, TransportError> {
        let address: Address = address
            .parse()
            .map_err(|_| TransportError::InvalidAddress(address.to_string()))?;
        Ok(self.adapter.device(address)?)
    }

    async fn find_characteristic(
        device: &Device,
        service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Result<Characteristic, TransportError> {
        for service in device.services().await? {
            let uuid = service.uuid().await?.to_string();
            if !uuid.eq_ignore_ascii_case(service_uuid) {
                continue;
            }
            for characteristic in service.characteristics().await? {
                let uuid = characteristic.uuid().await?.to_string();
                if uuid.eq_ignore_ascii_case(characteristic_uuid) {
                    return Ok(characteristic);
                }
            }
        }
        Err(TransportError::AttributeMissing(format!(
            "{service_uuid}/{characteristic_uuid}"
        )))
    }
}

#[async_trait]
impl BleCentral for BleAdapter {
    async fn scan(
        &self,
        timeout: Duration,
        found: mpsc::UnboundedSender<DiscoveredDevice>,
    ) -> Result<(), TransportError> {
        let events = self.adapter.discover_devices().await?;
        futures::pin_mut!(events);

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline => break,
                event = events.next() => match event {
                    Some(AdapterEvent::DeviceAdded(address)) => {
                        let device = match self.adapter.device(address) {
                            Ok(device) => device,
                            Err(err) => {
                                debug!("Skipping {}: {}", address, err);
                                continue;
                            }
                        };
                        let identifier = match device.name().await {
                            Ok(name) => name.unwrap_or_default(),
                            Err(err) => {
                                debug!("Skipping {}: {}", address, err);
                                continue;
                            }
                        };
                        // BlueZ does not expose the advertisement's connectable
                        // flag; it rejects connects to non-connectable
                        // advertisers instead.
                        let sighting = DiscoveredDevice {
                            identifier,
                            address: address.to_string(),
                            connectable: true,
                        };
                        if found.send(sighting).is_err() {
                            break;
                        }
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }
        // Dropping the discovery stream ends the BlueZ discovery session.
        Ok(())
    }

    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let device = self.device(address)?;
        if !device.is_connected().await? {
            device.connect().await?;
        }
        Ok(())
    }

    async fn disconnect(&self, address: &str) -> Result<(), TransportError> {
        // A forwarder left behind by a failed unsubscribe must not outlive
        // the connection.
        if let Some(task) = self.subscription.lock().await.take() {
            task.abort();
        }
        let device = self.device(address)?;
        device.disconnect().await?;
        Ok(())
    }

    async fn services(&self, address: &str) -> Result<Vec<ServiceInfo>, TransportError> {
        let device = self.device(address)?;
        let mut services = Vec::new();
        for service in device.services().await? {
            let uuid = service.uuid().await?.to_string();
            let mut characteristics = Vec::new();
            for characteristic in service.characteristics().await? {
                let flags = characteristic.flags().await?;
                characteristics.push(CharacteristicInfo {
                    uuid: characteristic.uuid().await?.to_string(),
                    can_notify: flags.notify,
                    can_indicate: flags.indicate,
                });
            }
            services.push(ServiceInfo {
                uuid,
                characteristics,
            });
        }
        Ok(services)
    }

    async fn subscribe(
        &self,
        address: &str,
        service_uuid: &str,
        characteristic_uuid: &str,
        mode: SubscribeMode,
        payloads: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(), TransportError> {
        let mut slot = self.subscription.lock().await;
        if slot.is_some() {
            return Err(TransportError::AlreadySubscribed);
        }

        let device = self.device(address)?;
        let characteristic =
            Self::find_characteristic(&device, service_uuid, characteristic_uuid).await?;

        // BlueZ picks the CCCD bits from the characteristic's own flags, so
        // both modes reach the radio as StartNotify.
        debug!("Starting {} stream on {}", mode, characteristic_uuid);
        let stream = characteristic.notify().await?;

        *slot = Some(tokio::spawn(async move {
            futures::pin_mut!(stream);
            while let Some(value) = stream.next().await {
                if payloads.send(value).is_err() {
                    break;
                }
            }
        }));
        Ok(())
    }

    async fn unsubscribe(
        &self,
        _address: &str,
        _service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Result<(), TransportError> {
        let task = self
            .subscription
            .lock()
            .await
            .take()
            .ok_or(TransportError::NotSubscribed)?;
        // Aborting the forwarder drops the notification stream, which issues
        // StopNotify.
        task.abort();
        debug!("Stopped stream on {}", characteristic_uuid);
        Ok(())
    }
}
