// Test doubles for the transport, input and sink seams

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::input::UserInput;
use crate::sink::PayloadSink;
use crate::transport::{BleCentral, DiscoveredDevice, ServiceInfo, SubscribeMode};

/// One transport call, in the order the session issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(String),
    DiscoverServices,
    Subscribe {
        service: String,
        characteristic: String,
        mode: SubscribeMode,
    },
    Unsubscribe,
    Disconnect,
}

/// Scriptable in-memory stand-in for the BLE stack. Replays configured
/// sightings, serves one service snapshot, records every call and can fail
/// any single operation.
#[derive(Default)]
pub struct MockCentral {
    found: Vec<DiscoveredDevice>,
    services: Vec<ServiceInfo>,
    payloads: Vec<Vec<u8>>,
    fail_connect: bool,
    fail_discovery: bool,
    fail_subscribe: bool,
    fail_unsubscribe: bool,
    calls: Mutex<Vec<Call>>,
    payload_tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

impl MockCentral {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_found(mut self, found: Vec<DiscoveredDevice>) -> Self {
        self.found = found;
        self
    }

    pub fn with_services(mut self, services: Vec<ServiceInfo>) -> Self {
        self.services = services;
        self
    }

    /// Frames delivered as soon as the subscription is established.
    pub fn with_payloads(mut self, payloads: Vec<Vec<u8>>) -> Self {
        self.payloads = payloads;
        self
    }

    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn fail_discovery(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    pub fn fail_subscribe(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    pub fn fail_unsubscribe(mut self) -> Self {
        self.fail_unsubscribe = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether the transport still holds the payload channel open; a clean
    /// unsubscribe releases it.
    pub fn holds_payload_channel(&self) -> bool {
        self.payload_tx.lock().unwrap().is_some()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BleCentral for MockCentral {
    async fn scan(
        &self,
        _timeout: Duration,
        found: mpsc::UnboundedSender<DiscoveredDevice>,
    ) -> Result<(), TransportError> {
        for sighting in &self.found {
            if found.send(sighting.clone()).is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        self.record(Call::Connect(address.to_string()));
        if self.fail_connect {
            return Err(TransportError::Injected("connect refused"));
        }
        Ok(())
    }

    async fn disconnect(&self, _address: &str) -> Result<(), TransportError> {
        self.record(Call::Disconnect);
        Ok(())
    }

    async fn services(&self, _address: &str) -> Result<Vec<ServiceInfo>, TransportError> {
        self.record(Call::DiscoverServices);
        if self.fail_discovery {
            return Err(TransportError::Injected("discovery refused"));
        }
        Ok(self.services.clone())
    }

    async fn subscribe(
        &self,
        _address: &str,
        service_uuid: &str,
        characteristic_uuid: &str,
        mode: SubscribeMode,
        payloads: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(), TransportError> {
        self.record(Call::Subscribe {
            service: service_uuid.to_string(),
            characteristic: characteristic_uuid.to_string(),
            mode,
        });
        if self.fail_subscribe {
            return Err(TransportError::Injected("subscribe refused"));
        }
        for frame in &self.payloads {
            payloads.send(frame.clone()).ok();
        }
        *self.payload_tx.lock().unwrap() = Some(payloads);
        Ok(())
    }

    async fn unsubscribe(
        &self,
        _address: &str,
        _service_uuid: &str,
        _characteristic_uuid: &str,
    ) -> Result<(), TransportError> {
        self.record(Call::Unsubscribe);
        if self.fail_unsubscribe {
            return Err(TransportError::Injected("unsubscribe refused"));
        }
        *self.payload_tx.lock().unwrap() = None;
        Ok(())
    }
}

/// Collects frames instead of printing them.
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Vec<Vec<u8>>,
}

impl PayloadSink for RecordingSink {
    fn on_payload(&mut self, bytes: &[u8]) {
        self.frames.push(bytes.to_vec());
    }
}

/// Canned answer for the selection prompt; records what was asked.
#[derive(Default)]
pub struct FakeInput {
    pub response: Option<usize>,
    pub prompts: Vec<(String, usize)>,
}

impl FakeInput {
    pub fn answering(response: Option<usize>) -> Self {
        Self {
            response,
            prompts: Vec::new(),
        }
    }
}

impl UserInput for FakeInput {
    fn get_integer(&mut self, prompt: &str, default: usize) -> Option<usize> {
        self.prompts.push((prompt.to_string(), default));
        self.response
    }
}
