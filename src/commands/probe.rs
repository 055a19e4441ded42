//! Interactive light naming and zone creation.

use super::CommandResult;
use crate::mappings::{GroupLight, GroupMapping, MappingsFile};
use alienfx_core::{Color, DeviceRegistry};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Walk each device's lights one at a time, lighting the current one
/// white, and record the names the user types. Empty input skips a
/// light; "q" stops the walk for that device.
pub fn probe(
    registry: &mut DeviceRegistry,
    mappings: &mut MappingsFile,
    path: &Path,
    count: u8,
) -> CommandResult {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut changed = false;

    for device in registry.devices_mut() {
        let label = device
            .description
            .clone()
            .unwrap_or_else(|| format!("{:04x}:{:04x}", device.vid, device.pid));
        let (vid, pid) = (device.vid, device.pid);
        let Some(engine) = device.engine.as_mut() else {
            continue;
        };
        println!("Probing {label} ({})", engine.version());

        'lights: for id in 0..count {
            // previous light off, current light on
            if id > 0 {
                engine.set_color(id - 1, Color::BLACK)?;
            }
            engine.set_color(id, Color::WHITE)?;
            engine.update_colors()?;

            print!("  light {id} name (empty = skip, q = done): ");
            io::stdout().flush()?;
            let line = match lines.next() {
                Some(line) => line?,
                None => break 'lights,
            };
            let name = line.trim();
            if name.eq_ignore_ascii_case("q") {
                break 'lights;
            }
            if !name.is_empty() {
                mappings
                    .device_mut(vid, pid, &label)
                    .name_light(id, name.to_string());
                changed = true;
            }
        }

        // leave nothing lit behind
        let lit: Vec<u8> = (0..count).collect();
        engine.set_multi_color(&lit, Color::BLACK)?;
        engine.update_colors()?;
    }

    if changed {
        mappings.save(path)?;
        println!("Saved {}", path.display());
    }
    Ok(())
}

/// Create or replace a named zone. Members come from the command line
/// as "light" (applies to every device) or "vid:pid/light"; with no
/// members given, they are read interactively.
pub fn createzone(
    registry: &mut DeviceRegistry,
    mappings: &mut MappingsFile,
    path: &Path,
    name: &str,
    members: &[String],
) -> CommandResult {
    let specs: Vec<String> = if members.is_empty() {
        println!("Zone '{name}': enter lights one per line (empty line = done)");
        let stdin = io::stdin();
        let mut specs = Vec::new();
        for line in stdin.lock().lines() {
            let line = line?;
            let spec = line.trim();
            if spec.is_empty() {
                break;
            }
            specs.push(spec.to_string());
        }
        specs
    } else {
        members.to_vec()
    };

    let mut lights = Vec::new();
    for spec in &specs {
        match resolve_member(registry, mappings, spec) {
            Some(resolved) => lights.extend(resolved),
            None => eprintln!("Skipping '{spec}': no such light on any device"),
        }
    }
    if lights.is_empty() {
        eprintln!("Zone '{name}' would be empty, not saving");
        return Ok(());
    }

    let count = lights.len();
    match mappings.groups.iter_mut().find(|g| g.name.eq_ignore_ascii_case(name)) {
        Some(group) => group.lights = lights,
        None => mappings.groups.push(GroupMapping {
            name: name.to_string(),
            lights,
        }),
    }
    mappings.save(path)?;
    println!("Zone '{name}' saved with {count} lights");
    Ok(())
}

/// Resolve one member spec against the present devices.
fn resolve_member(
    registry: &DeviceRegistry,
    mappings: &MappingsFile,
    spec: &str,
) -> Option<Vec<GroupLight>> {
    let (filter, light) = match spec.split_once('/') {
        Some((dev, light)) => (super::parse_device_filter(dev).ok(), light),
        None => (None, spec),
    };
    let resolved: Vec<GroupLight> = registry
        .devices()
        .iter()
        .filter(|d| filter.map_or(true, |(vid, pid)| d.vid == vid && d.pid == pid))
        .filter_map(|d| {
            mappings
                .resolve_light(d.vid, d.pid, light)
                .map(|lightid| GroupLight {
                    vid: d.vid,
                    pid: d.pid,
                    lightid,
                })
        })
        .collect();
    if resolved.is_empty() {
        None
    } else {
        Some(resolved)
    }
}
