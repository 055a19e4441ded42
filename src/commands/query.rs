//! Read-only command handlers.

use super::CommandResult;
use alienfx_core::{DeviceRegistry, Readiness};

/// List detected controllers with their protocol generation and
/// current readiness.
pub fn status(registry: &mut DeviceRegistry) -> CommandResult {
    if registry.devices().is_empty() {
        println!("No supported AlienFX controller found");
        return Ok(());
    }
    for device in registry.devices_mut() {
        let header = format!(
            "{:04x}:{:04x} {} ({}, report {} bytes)",
            device.vid,
            device.pid,
            device.description.as_deref().unwrap_or("AlienFX controller"),
            device.version,
            device.report_length,
        );
        match device.engine.as_mut() {
            Some(engine) => {
                let raw = engine.get_device_status()?;
                let readiness = match engine.is_device_ready()? {
                    Readiness::Ready => "ready",
                    Readiness::Busy => "busy",
                    Readiness::Stalled => "stalled",
                };
                println!("{header}: {readiness} (status 0x{raw:02x})");
            }
            None => println!("{header}: disconnected"),
        }
    }
    Ok(())
}
