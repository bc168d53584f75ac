// Rendering of received payload frames

/// Receives every frame delivered by the active subscription.
pub trait PayloadSink: Send {
    fn on_payload(&mut self, bytes: &[u8]);
}

/// Default sink: dump each frame as hex.
pub struct HexDumpSink;

impl PayloadSink for HexDumpSink {
    fn on_payload(&mut self, bytes: &[u8]) {
        // TODO: forward frames to the SimConnect/FSUIPC bridge once the
        // payload layout is mapped.
        println!("Indication ({} bytes): {}", bytes.len(), format_hex(bytes));
    }
}

pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
