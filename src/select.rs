// Target device filtering and selection

use log::info;

use crate::config::SelectionDefault;
use crate::error::Error;
use crate::input::UserInput;
use crate::transport::DiscoveredDevice;

/// Narrow the scan results to `identifier` and pick one device.
///
/// A single match is taken without interaction. Multiple matches are listed
/// in discovery order and resolved through the integer prompt; a
/// non-numeric or out-of-range answer is `InvalidSelection`.
pub fn select_target<'a>(
    devices: &'a [DiscoveredDevice],
    identifier: &str,
    default: SelectionDefault,
    input: &mut dyn UserInput,
) -> Result<&'a DiscoveredDevice, Error> {
    let matches: Vec<&DiscoveredDevice> = devices
        .iter()
        .filter(|device| device.identifier == identifier)
        .collect();

    match matches.len() {
        0 => Err(Error::NoTargetDeviceFound {
            identifier: identifier.to_string(),
        }),
        1 => {
            info!("One {} device found, auto-selecting it", identifier);
            Ok(matches[0])
        }
        count => {
            println!("{identifier} devices:");
            for (index, device) in matches.iter().enumerate() {
                println!("[{index}] {} [{}]", device.identifier, device.address);
            }
            let chosen = input
                .get_integer("Select device index", default.index(count))
                .ok_or(Error::InvalidSelection)?;
            matches.get(chosen).copied().ok_or(Error::InvalidSelection)
        }
    }
}
