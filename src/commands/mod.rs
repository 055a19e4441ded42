//! Command handlers for the CLI application.
//!
//! - `set`: lighting commands (setall, setone, setzone, setaction, ...)
//! - `query`: status
//! - `probe`: interactive light naming and zone creation

pub mod probe;
pub mod query;
pub mod set;

use alienfx_core::{ClassifiedDevice, DeviceRegistry};
use alienfx_transport::{BoxedTransport, HidDiscovery, ProbeCandidate, TransportError};
use tracing::debug;

/// Result type for command handlers
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Scan the bus and open every supported controller.
///
/// Controllers with unnumbered reports get the hidapi write quirk
/// applied at open time.
pub fn open_registry(discovery: &mut HidDiscovery) -> Result<DeviceRegistry, TransportError> {
    let candidates = discovery.candidates()?;
    debug!(count = candidates.len(), "HID candidates");

    let mut registry = DeviceRegistry::new();
    let mut opener = |classified: &ClassifiedDevice,
                      candidate: &ProbeCandidate|
     -> Result<(BoxedTransport, Option<String>), TransportError> {
        let mut transport = discovery.open(candidate)?;
        if classified.version.report_id() == 0 {
            transport = transport.with_unnumbered_reports();
        }
        let description = transport
            .description()
            .map(str::to_string)
            .or_else(|| candidate.description());
        Ok((Box::new(transport), description))
    };
    registry.enumerate(&candidates, &mut opener);
    Ok(registry)
}

/// Parse a `vid:pid` device filter (hex, with or without 0x).
pub fn parse_device_filter(arg: &str) -> Result<(u16, u16), String> {
    let (vid, pid) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected vid:pid, got '{arg}'"))?;
    let parse = |s: &str| {
        u16::from_str_radix(s.trim_start_matches("0x"), 16)
            .map_err(|_| format!("'{s}' is not a hex id"))
    };
    Ok((parse(vid)?, parse(pid)?))
}

/// Run a closure over every present engine matching the optional
/// `vid:pid` filter. Prints a notice and succeeds when nothing matches.
pub fn for_each_engine<F>(
    registry: &mut DeviceRegistry,
    filter: Option<(u16, u16)>,
    mut f: F,
) -> CommandResult
where
    F: FnMut(&mut alienfx_core::RegisteredDevice) -> CommandResult,
{
    let mut touched = 0;
    for device in registry.devices_mut() {
        if let Some((vid, pid)) = filter {
            if device.vid != vid || device.pid != pid {
                continue;
            }
        }
        if device.engine.is_none() {
            continue;
        }
        f(device)?;
        touched += 1;
    }
    if touched == 0 {
        eprintln!("No supported AlienFX controller found");
    }
    Ok(())
}
