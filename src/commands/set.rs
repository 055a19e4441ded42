//! Lighting (write) command handlers.

use super::{for_each_engine, CommandResult};
use crate::mappings::MappingsFile;
use alienfx_core::{
    ActionKind, ActionPhase, Color, DeviceRegistry, GlobalEffect, LightBlock, MappedLight,
};

/// Lights walked when a device has no saved mapping yet
const DEFAULT_LIGHT_COUNT: u8 = 24;

/// Timing carried from the global CLI options into effect phases.
#[derive(Debug, Clone, Copy)]
pub struct EffectTiming {
    pub tempo: u8,
    pub length: u8,
}

/// Every addressable light on one device: the saved mapping when one
/// exists, otherwise the default index walk.
fn device_lights(mappings: &MappingsFile, vid: u16, pid: u16) -> Vec<MappedLight> {
    match mappings.device(vid, pid) {
        Some(dev) if !dev.lights.is_empty() => dev
            .lights
            .iter()
            .map(|l| MappedLight {
                id: l.lightid,
                flags: l.flags,
            })
            .collect(),
        _ => (0..DEFAULT_LIGHT_COUNT).map(MappedLight::plain).collect(),
    }
}

fn apply_brightness(
    registry: &mut DeviceRegistry,
    filter: Option<(u16, u16)>,
    mappings: &MappingsFile,
    level: u8,
    power: bool,
) -> CommandResult {
    // 0-100 user scale onto the 0-255 engine scale
    let target = (level as u16 * 255 / 100) as u8;
    for_each_engine(registry, filter, |device| {
        let lights = device_lights(mappings, device.vid, device.pid);
        if let Some(engine) = device.engine.as_mut() {
            engine.set_brightness(target, 255, &lights, power)?;
        }
        Ok(())
    })
}

/// Apply the global --brightness option before a lighting command.
pub fn pre_brightness(
    registry: &mut DeviceRegistry,
    filter: Option<(u16, u16)>,
    mappings: &MappingsFile,
    level: Option<u8>,
) -> CommandResult {
    match level {
        Some(level) => apply_brightness(registry, filter, mappings, level, false),
        None => Ok(()),
    }
}

pub fn setall(
    registry: &mut DeviceRegistry,
    filter: Option<(u16, u16)>,
    mappings: &MappingsFile,
    color: Color,
) -> CommandResult {
    for_each_engine(registry, filter, |device| {
        let lights: Vec<u8> = device_lights(mappings, device.vid, device.pid)
            .iter()
            .map(|l| l.id)
            .collect();
        if let Some(engine) = device.engine.as_mut() {
            engine.set_multi_color(&lights, color)?;
            engine.update_colors()?;
            println!(
                "{}: {} lights -> #{:02X}{:02X}{:02X}",
                device.description.as_deref().unwrap_or("device"),
                lights.len(),
                color.r,
                color.g,
                color.b
            );
        }
        Ok(())
    })
}

pub fn setone(
    registry: &mut DeviceRegistry,
    filter: Option<(u16, u16)>,
    mappings: &MappingsFile,
    light: &str,
    color: Color,
) -> CommandResult {
    for_each_engine(registry, filter, |device| {
        let Some(id) = mappings.resolve_light(device.vid, device.pid, light) else {
            eprintln!(
                "{}: no light named '{light}'",
                device.description.as_deref().unwrap_or("device")
            );
            return Ok(());
        };
        if let Some(engine) = device.engine.as_mut() {
            engine.set_color(id, color)?;
            engine.update_colors()?;
            println!("Light {id} -> #{:02X}{:02X}{:02X}", color.r, color.g, color.b);
        }
        Ok(())
    })
}

pub fn setzone(
    registry: &mut DeviceRegistry,
    filter: Option<(u16, u16)>,
    mappings: &MappingsFile,
    zone: &str,
    color: Color,
) -> CommandResult {
    let Some(group) = mappings.group(zone) else {
        eprintln!("No zone named '{zone}' (see createzone)");
        return Ok(());
    };
    let members = group.lights.clone();
    for_each_engine(registry, filter, |device| {
        let lights: Vec<u8> = members
            .iter()
            .filter(|l| l.vid == device.vid && l.pid == device.pid)
            .map(|l| l.lightid)
            .collect();
        if lights.is_empty() {
            return Ok(());
        }
        if let Some(engine) = device.engine.as_mut() {
            engine.set_multi_color(&lights, color)?;
            engine.update_colors()?;
            println!(
                "{}: zone '{zone}' ({} lights) -> #{:02X}{:02X}{:02X}",
                device.description.as_deref().unwrap_or("device"),
                lights.len(),
                color.r,
                color.g,
                color.b
            );
        }
        Ok(())
    })
}

/// Build the phase list for a named effect.
///
/// Morph gets an explicit return phase so the loop runs color1 ->
/// color2 -> color1; everything else is a single phase.
pub fn effect_phases(
    kind: ActionKind,
    timing: EffectTiming,
    color1: Color,
    color2: Color,
) -> Vec<ActionPhase> {
    let phase = |kind, color| ActionPhase {
        kind,
        time: timing.length,
        tempo: timing.tempo,
        color,
    };
    match kind {
        ActionKind::Color => vec![ActionPhase::color(color1)],
        ActionKind::Morph => vec![phase(kind, color1), phase(kind, color2)],
        _ => vec![phase(kind, color1)],
    }
}

pub fn setaction(
    registry: &mut DeviceRegistry,
    filter: Option<(u16, u16)>,
    mappings: &MappingsFile,
    action: ActionKind,
    light: &str,
    timing: EffectTiming,
    color1: Color,
    color2: Color,
) -> CommandResult {
    for_each_engine(registry, filter, |device| {
        let Some(id) = mappings.resolve_light(device.vid, device.pid, light) else {
            eprintln!(
                "{}: no light named '{light}'",
                device.description.as_deref().unwrap_or("device")
            );
            return Ok(());
        };
        if let Some(engine) = device.engine.as_mut() {
            let block = LightBlock {
                light: id,
                phases: effect_phases(action, timing, color1, color2),
            };
            engine.set_action(&block)?;
            engine.update_colors()?;
            println!("Light {id} -> {}", action.name());
        }
        Ok(())
    })
}

pub fn setzoneaction(
    registry: &mut DeviceRegistry,
    filter: Option<(u16, u16)>,
    mappings: &MappingsFile,
    action: ActionKind,
    zone: &str,
    timing: EffectTiming,
    color1: Color,
    color2: Color,
) -> CommandResult {
    let Some(group) = mappings.group(zone) else {
        eprintln!("No zone named '{zone}' (see createzone)");
        return Ok(());
    };
    let members = group.lights.clone();
    for_each_engine(registry, filter, |device| {
        let blocks: Vec<LightBlock> = members
            .iter()
            .filter(|l| l.vid == device.vid && l.pid == device.pid)
            .map(|l| LightBlock {
                light: l.lightid,
                phases: effect_phases(action, timing, color1, color2),
            })
            .collect();
        if blocks.is_empty() {
            return Ok(());
        }
        if let Some(engine) = device.engine.as_mut() {
            engine.set_multi_action(&blocks, false)?;
            engine.update_colors()?;
            println!("Zone '{zone}' ({} lights) -> {}", blocks.len(), action.name());
        }
        Ok(())
    })
}

pub fn setdim(
    registry: &mut DeviceRegistry,
    filter: Option<(u16, u16)>,
    mappings: &MappingsFile,
    level: u8,
    power: bool,
) -> CommandResult {
    apply_brightness(registry, filter, mappings, level, power)?;
    println!("Brightness -> {level}%");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn setglobal(
    registry: &mut DeviceRegistry,
    filter: Option<(u16, u16)>,
    tempo: u8,
    effect: u8,
    mode: u8,
    color1: Color,
    color2: Color,
    colors: Option<u8>,
) -> CommandResult {
    let fx = GlobalEffect {
        effect,
        mode,
        color_count: colors.unwrap_or(if color2.is_black() { 1 } else { 2 }),
        tempo,
        color1,
        color2,
    };
    for_each_engine(registry, filter, |device| {
        let Some(engine) = device.engine.as_mut() else {
            return Ok(());
        };
        if !engine.has_global_effects() {
            eprintln!(
                "{}: {} has no firmware global effects",
                device.description.as_deref().unwrap_or("device"),
                engine.version()
            );
            return Ok(());
        }
        if engine.set_global_effects(&fx)? {
            println!("Global effect {effect} (mode {mode}) applied");
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morph_gets_a_return_phase() {
        let timing = EffectTiming { tempo: 8, length: 8 };
        let phases = effect_phases(ActionKind::Morph, timing, Color::RED, Color::BLUE);
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].color, Color::RED);
        assert_eq!(phases[1].color, Color::BLUE);
        assert_eq!(phases[0].tempo, 8);
    }

    #[test]
    fn static_color_ignores_timing() {
        let timing = EffectTiming { tempo: 3, length: 9 };
        let phases = effect_phases(ActionKind::Color, timing, Color::GREEN, Color::BLACK);
        assert_eq!(phases, vec![ActionPhase::color(Color::GREEN)]);
    }
}
