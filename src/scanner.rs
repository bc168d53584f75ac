// Time-bounded discovery with dedup and connectable filtering

use std::collections::HashSet;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc;

use crate::error::Error;
use crate::transport::{BleCentral, DiscoveredDevice};

/// Scan for `timeout`, collecting each connectable peripheral once.
///
/// Sightings stream in on a channel while the transport scan runs; the
/// collector applies the connectable filter, discards addressless
/// sightings and keeps the first occurrence per address. An empty result
/// is not an error here.
pub async fn scan<T>(transport: &T, timeout: Duration) -> Result<Vec<DiscoveredDevice>, Error>
where
    T: BleCentral + ?Sized,
{
    let (found_tx, mut found_rx) = mpsc::unbounded_channel();

    info!("Scan started");
    let scan = transport.scan(timeout, found_tx);
    let collect = async {
        let mut seen = HashSet::new();
        let mut devices = Vec::new();
        while let Some(sighting) = found_rx.recv().await {
            if !sighting.connectable {
                debug!("Ignoring non-connectable {}", sighting.address);
                continue;
            }
            if sighting.address.is_empty() {
                continue;
            }
            if !seen.insert(sighting.address.clone()) {
                continue;
            }
            info!("Found device: {} [{}]", sighting.identifier, sighting.address);
            devices.push(sighting);
        }
        devices
    };

    let (scan_result, devices) = tokio::join!(scan, collect);
    scan_result.map_err(Error::ScanFailed)?;
    info!("Scan stopped");

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockCentral;

    fn sighting(identifier: &str, address: &str, connectable: bool) -> DiscoveredDevice {
        DiscoveredDevice {
            identifier: identifier.to_string(),
            address: address.to_string(),
            connectable,
        }
    }

    #[tokio::test]
    async fn keeps_first_sighting_of_each_address() {
        let mock = MockCentral::new().with_found(vec![
            sighting("SHB1000", "AA:AA", true),
            sighting("RENAMED", "AA:AA", true),
            sighting("OTHER", "BB:BB", true),
            sighting("OTHER", "BB:BB", true),
        ]);

        let devices = scan(&mock, Duration::from_secs(1)).await.unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].identifier, "SHB1000");
        assert_eq!(devices[0].address, "AA:AA");
        assert_eq!(devices[1].address, "BB:BB");
    }

    #[tokio::test]
    async fn drops_non_connectable_sightings() {
        let mock = MockCentral::new().with_found(vec![
            sighting("BEACON", "AA:AA", false),
            sighting("BEACON", "AA:AA", false),
            sighting("SHB1000", "BB:BB", true),
        ]);

        let devices = scan(&mock, Duration::from_secs(1)).await.unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].address, "BB:BB");
    }

    #[tokio::test]
    async fn drops_sightings_without_an_address() {
        let mock = MockCentral::new().with_found(vec![
            sighting("SHB1000", "", true),
            sighting("SHB1000", "AA:AA", true),
        ]);

        let devices = scan(&mock, Duration::from_secs(1)).await.unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].address, "AA:AA");
    }

    #[tokio::test]
    async fn empty_scan_is_not_an_error() {
        let mock = MockCentral::new();
        let devices = scan(&mock, Duration::from_secs(1)).await.unwrap();
        assert!(devices.is_empty());
    }
}
