// Terminal link to Simionic G1000 panels over Bluetooth LE

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use log::{debug, info};
use tokio::signal;

mod bluetooth;
mod config;
mod error;
mod input;
mod scanner;
mod select;
mod session;
mod sink;
mod transport;

#[cfg(test)]
mod testutil;

use crate::bluetooth::BleAdapter;
use crate::config::Config;
use crate::error::Error;
use crate::input::{ConsoleInput, UserInput};
use crate::session::Session;
use crate::sink::{HexDumpSink, PayloadSink};
use crate::transport::BleCentral;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::load().context("failed to load configuration")?;
    debug!("Configuration: {:?}", config);

    let transport = BleAdapter::new(config.bluetooth.adapter.as_deref())
        .await
        .map_err(Error::AdapterNotFound)?;
    info!("Using Bluetooth adapter: {}", transport.name());

    let stop = async {
        tokio::select! {
            _ = input::wait_for_enter() => {}
            _ = signal::ctrl_c() => {}
        }
    };
    run(&transport, &config, &mut ConsoleInput, &mut HexDumpSink, stop).await?;

    info!("Disconnected. Exiting.");
    Ok(())
}

/// Scan, pick the target panel, then hand the rest of the lifecycle to the
/// session.
async fn run<T, F>(
    transport: &T,
    config: &Config,
    input: &mut dyn UserInput,
    sink: &mut dyn PayloadSink,
    stop: F,
) -> Result<(), Error>
where
    T: BleCentral + ?Sized,
    F: Future<Output = ()>,
{
    let timeout = Duration::from_secs(config.bluetooth.scan_timeout_secs);
    let devices = scanner::scan(transport, timeout).await?;
    if devices.is_empty() {
        return Err(Error::NoConnectablePeripherals);
    }

    let device = select::select_target(
        &devices,
        &config.target.identifier,
        config.target.selection_default,
        input,
    )?
    .clone();

    info!("Connecting to {} [{}]", device.identifier, device.address);
    let mut session = Session::new(transport, device, &config.target.characteristic_uuid);
    let result = session.run(sink, stop).await;
    debug!("Session ended in state {:?}", session.state());
    result
}
