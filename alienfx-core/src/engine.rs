//! Per-device protocol engine
//!
//! One engine per open controller. The engine owns the transport, knows
//! the device's generation and report length, and carries the small
//! amount of sequencing state the older generations need: the command
//! chain counter, the staged-but-uncommitted flag, and the last applied
//! hardware brightness.
//!
//! The staged generations (V2-V5) follow reset -> stage -> commit ->
//! poll; the immediate ones (V6-V8) apply every packet as it lands.

use std::thread;

use tracing::{debug, trace, warn};

use alienfx_transport::BoxedTransport;

use crate::action::{ActionKind, ActionPhase, LightBlock, MappedLight};
use crate::builder::{self, Patch};
use crate::catalog::{self, timing, v1, v4, v5, v6, v7, v8, ProtocolVersion};
use crate::color::{Color, PackedColor};
use crate::error::EngineError;
use crate::poll::PollPolicy;
use crate::probe::ClassifiedDevice;

/// Highest light index addressable through the v1-family 3-byte mask
const V1_MAX_LIGHTS: u8 = 24;

/// Default brightness until the caller sets one
const DEFAULT_BRIGHTNESS: u8 = 64;

/// Tri-state controller readiness. V4 controllers that stopped
/// answering the status query report `Stalled`; their ready-waits treat
/// that as "no point waiting longer".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Busy,
    Stalled,
}

/// A hardware-wide animated effect (V5/V8 only)
#[derive(Debug, Clone, Copy)]
pub struct GlobalEffect {
    /// Effect selector; zero turns global effects off
    pub effect: u8,
    /// V8 trigger mode (always-on, on-touch, ...)
    pub mode: u8,
    /// How many of the two colors the effect animates (1 or 2)
    pub color_count: u8,
    pub tempo: u8,
    pub color1: Color,
    pub color2: Color,
}

pub struct ProtocolEngine {
    version: ProtocolVersion,
    vid: u16,
    pid: u16,
    report_length: usize,
    transport: BoxedTransport,
    /// v1-family command chain counter, 1-based
    chain: u8,
    /// True between a reset and the matching commit
    in_set: bool,
    /// Last brightness written to (or assumed by) the hardware
    bright: u8,
}

impl ProtocolEngine {
    pub fn new(device: ClassifiedDevice, transport: BoxedTransport) -> Self {
        Self {
            version: device.version,
            vid: device.vid,
            pid: device.pid,
            report_length: device.report_length,
            transport,
            chain: 1,
            in_set: false,
            bright: DEFAULT_BRIGHTNESS,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn vid(&self) -> u16 {
        self.vid
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    pub fn report_length(&self) -> usize {
        self.report_length
    }

    pub fn brightness(&self) -> u8 {
        self.bright
    }

    pub fn is_staging(&self) -> bool {
        self.in_set
    }

    /// Build a packet from `template` + `patches` and push it through
    /// the generation's transfer style.
    fn send(&self, template: &[u8], patches: &[Patch]) -> Result<(), EngineError> {
        let packet = builder::build(
            template,
            self.version.report_id(),
            self.report_length,
            self.version.fill_byte(),
            patches,
        );
        trace!(version = %self.version, "out: {:02X?}", packet.bytes);
        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 | ProtocolVersion::V4 => {
                self.transport.send_output_report(&packet.bytes)?
            }
            ProtocolVersion::V5 => self.transport.send_feature_report(&packet.bytes)?,
            ProtocolVersion::V6 => {
                self.transport.interrupt_write(&packet.bytes)?;
            }
            ProtocolVersion::V7 => {
                self.transport.interrupt_write(&packet.bytes)?;
                let mut echo = vec![0u8; self.report_length];
                self.transport.interrupt_read(&mut echo)?;
            }
            ProtocolVersion::V8 => {
                if packet.single_byte_patch {
                    thread::sleep(timing::V8_FEATURE_PRE_DELAY);
                    self.transport.send_feature_report(&packet.bytes)?;
                    thread::sleep(timing::V8_FEATURE_POST_DELAY);
                } else {
                    self.transport.interrupt_write(&packet.bytes)?;
                }
            }
        }
        Ok(())
    }

    /// Open a staging window if none is open.
    fn begin_set(&mut self) -> Result<(), EngineError> {
        if !self.in_set {
            self.reset()?;
        }
        Ok(())
    }

    /// Put the controller into its "accepting commands" state and open
    /// a staging window.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 => {
                self.send(&v1::cmd::RESET, &[])?;
                if !self.wait_for_ready()? {
                    warn!(version = %self.version, "controller not ready after reset");
                }
            }
            ProtocolVersion::V4 => {
                self.send(&v4::cmd::CONTROL, &[Patch::new(4, vec![4])])?;
                self.send(&v4::cmd::CONTROL, &[Patch::new(4, vec![1])])?;
                if !self.wait_for_ready()? {
                    warn!(version = %self.version, "controller not ready after reset");
                }
            }
            ProtocolVersion::V5 => self.send(&v5::cmd::RESET, &[])?,
            ProtocolVersion::V6 => self.send(&v6::cmd::SYSTEM_RESET, &[])?,
            // no reset concept; packets apply immediately
            ProtocolVersion::V7 | ProtocolVersion::V8 => {}
        }
        self.in_set = true;
        self.chain = 1;
        Ok(())
    }

    /// Commit the staged state. Returns false when nothing was staged.
    pub fn update_colors(&mut self) -> Result<bool, EngineError> {
        if !self.in_set {
            return Ok(false);
        }
        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 => self.send(&v1::cmd::UPDATE, &[])?,
            // the unpatched control packet doubles as the V4 commit
            ProtocolVersion::V4 => self.send(&v4::cmd::CONTROL, &[])?,
            ProtocolVersion::V5 => self.send(&v5::cmd::UPDATE, &[])?,
            _ => {}
        }
        self.in_set = false;
        self.chain = 1;
        Ok(true)
    }

    /// Stage one static color on one light.
    pub fn set_color(&mut self, light: u8, color: Color) -> Result<(), EngineError> {
        self.set_multi_color(&[light], color)
    }

    /// Stage one static color on several lights, batched the way the
    /// generation allows.
    pub fn set_multi_color(&mut self, lights: &[u8], color: Color) -> Result<(), EngineError> {
        if lights.is_empty() {
            return Err(EngineError::EmptyLights);
        }
        self.begin_set()?;
        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 => {
                let mask = self.v1_light_mask(lights)?;
                self.v1_stage_color(mask, v1::op::COLOR, color, Color::BLACK)
            }
            ProtocolVersion::V4 => self.v4_stage_one_color(lights, color),
            ProtocolVersion::V5 => {
                for chunk in lights.chunks(self.v5_blocks_per_packet()) {
                    let mut patches =
                        vec![Patch::new(v5::COUNT_OFFSET, vec![chunk.len() as u8])];
                    let mut pos = v5::BLOCK_OFFSET;
                    for &light in chunk {
                        patches.push(Patch::new(
                            pos,
                            vec![light + 1, color.r, color.g, color.b],
                        ));
                        pos += v5::BLOCK_STRIDE;
                    }
                    self.send(&v5::cmd::COLOR_SET, &patches)?;
                }
                self.send(&v5::cmd::LOOP, &[])
            }
            ProtocolVersion::V6 => {
                // the XOR mask addresses lights as bits of one byte
                let group = lights.iter().fold(0u8, |m, &l| m | 1u8.wrapping_shl(l.into()));
                self.v6_stage(group, &ActionPhase::color(color), None)
            }
            ProtocolVersion::V7 => {
                for &light in lights {
                    self.v7_stage(light, &[ActionPhase::color(color)])?;
                }
                Ok(())
            }
            ProtocolVersion::V8 => {
                let data: Vec<Vec<u8>> = lights
                    .iter()
                    .map(|&light| {
                        v8_data_block(&LightBlock {
                            light,
                            phases: vec![ActionPhase::color(color)],
                        })
                    })
                    .collect();
                self.v8_send_blocks(&data)
            }
        }
    }

    /// Stage a full action program on one light.
    pub fn set_action(&mut self, block: &LightBlock) -> Result<(), EngineError> {
        let first = *block.phases.first().ok_or(EngineError::EmptyAction {
            light: block.light,
        })?;
        self.begin_set()?;
        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 => self.v1_set_action(block, first),
            ProtocolVersion::V4 => {
                // static colors take the one-packet short path
                if block.phases.len() == 1 && first.kind == ActionKind::Color {
                    self.v4_stage_one_color(&[block.light], first.color)
                } else {
                    self.v4_set_action(block)
                }
            }
            ProtocolVersion::V5 => {
                // the controller wants the block twice for a stable apply
                let data = vec![block.light + 1, first.color.r, first.color.g, first.color.b];
                self.send(
                    &v5::cmd::COLOR_SET,
                    &[
                        Patch::new(v5::COUNT_OFFSET, vec![2]),
                        Patch::new(v5::BLOCK_OFFSET, data.clone()),
                        Patch::new(v5::BLOCK_OFFSET + v5::BLOCK_STRIDE, data),
                    ],
                )?;
                self.send(&v5::cmd::LOOP, &[])
            }
            ProtocolVersion::V6 => {
                // single-light actions carry the raw index, not a group bit
                self.v6_stage(block.light, &first, block.phases.get(1).map(|p| p.color))
            }
            ProtocolVersion::V7 => self.v7_stage(block.light, &block.phases),
            ProtocolVersion::V8 => self.v8_send_blocks(&[v8_data_block(block)]),
        }
    }

    /// Stage many action programs. `save` additionally persists the set
    /// through the power-mode path once everything is applied.
    pub fn set_multi_action(&mut self, blocks: &[LightBlock], save: bool) -> Result<(), EngineError> {
        if let Some(empty) = blocks.iter().find(|b| b.phases.is_empty()) {
            return Err(EngineError::EmptyAction { light: empty.light });
        }
        match self.version {
            ProtocolVersion::V8 => {
                self.begin_set()?;
                let data: Vec<Vec<u8>> = blocks.iter().map(v8_data_block).collect();
                self.v8_send_blocks(&data)?;
            }
            _ => {
                for block in blocks {
                    self.set_action(block)?;
                }
            }
        }
        if save {
            self.set_power_action(blocks, true)?;
        }
        Ok(())
    }

    /// Persist power-state (AC/battery) lighting. Only V2-V4 hardware
    /// stores power programs; newer controllers keep nothing and this
    /// is a successful no-op for them.
    pub fn set_power_action(&mut self, blocks: &[LightBlock], save: bool) -> Result<(), EngineError> {
        if let Some(empty) = blocks.iter().find(|b| b.phases.is_empty()) {
            return Err(EngineError::EmptyAction { light: empty.light });
        }
        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 => self.v1_power_action(blocks, save),
            ProtocolVersion::V4 => self.v4_power_action(blocks, save),
            _ => Ok(()),
        }
    }

    /// Apply hardware brightness.
    ///
    /// `target` and `global_dim` are both 0..=255; the effective level
    /// is `target * global_dim / 255` mapped onto the generation's
    /// scale. Returns true when the caller should re-send colors (the
    /// v1 family wipes them when crossing to or from zero).
    pub fn set_brightness(
        &mut self,
        target: u8,
        global_dim: u8,
        lights: &[MappedLight],
        affect_power: bool,
    ) -> Result<bool, EngineError> {
        if self.in_set {
            self.update_colors()?;
        }
        let old = self.bright;
        let scale = self.version.brightness_scale();
        // integer order matters: scale to 0..255 first, then onto the
        // hardware range
        let bright =
            ((u32::from(target) * u32::from(global_dim)) / 255 * u32::from(scale) / 255) as u8;
        self.bright = bright;
        debug!(version = %self.version, target, bright, "brightness");

        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 => {
                if bright == 0 || old == 0 {
                    let variant = if target > 0 {
                        v1::reset::ALL_ON
                    } else if affect_power {
                        v1::reset::ALL_OFF
                    } else {
                        v1::reset::TOUCH_CONTROLS
                    };
                    self.send(&v1::cmd::RESET, &[Patch::new(2, vec![variant])])?;
                    self.wait_for_ready()?;
                }
                self.send(&v1::cmd::DIM, &[Patch::new(2, vec![bright])])?;
                Ok(bright > 0 && old == 0)
            }
            ProtocolVersion::V4 => {
                let ids: Vec<u8> = lights
                    .iter()
                    .filter(|l| l.flags == 0 || affect_power)
                    .map(|l| l.id)
                    .collect();
                self.send(
                    &v4::cmd::TURN_ON,
                    &[
                        Patch::new(3, vec![scale - bright, 0, ids.len() as u8]),
                        Patch::new(6, ids),
                    ],
                )?;
                Ok(true)
            }
            ProtocolVersion::V5 => {
                self.reset()?;
                self.send(&v5::cmd::TURN_ON_SET, &[Patch::new(4, vec![bright])])?;
                Ok(true)
            }
            ProtocolVersion::V8 => {
                self.send(&v8::cmd::SET_BRIGHTNESS, &[Patch::new(2, vec![bright])])?;
                Ok(true)
            }
            // brightness travels inside every command block
            ProtocolVersion::V6 | ProtocolVersion::V7 => Ok(true),
        }
    }

    pub fn has_global_effects(&self) -> bool {
        matches!(self.version, ProtocolVersion::V5 | ProtocolVersion::V8)
    }

    /// Configure a hardware-wide effect. Returns false on generations
    /// without global effects.
    pub fn set_global_effects(&mut self, fx: &GlobalEffect) -> Result<bool, EngineError> {
        match self.version {
            ProtocolVersion::V5 => {
                if self.in_set {
                    self.update_colors()?;
                }
                self.reset()?;
                if fx.effect == 0 {
                    self.send(&v5::cmd::SET_EFFECT, &[Patch::new(2, v5::EFFECT_OFF.to_vec())])?;
                } else {
                    self.send(
                        &v5::cmd::SET_EFFECT,
                        &[
                            Patch::new(2, vec![fx.effect, fx.tempo]),
                            Patch::new(
                                9,
                                vec![
                                    fx.color_count.saturating_sub(1),
                                    fx.color1.r,
                                    fx.color1.g,
                                    fx.color1.b,
                                    fx.color2.r,
                                    fx.color2.g,
                                    fx.color2.b,
                                ],
                            ),
                        ],
                    )?;
                }
                self.update_colors()?;
                Ok(true)
            }
            ProtocolVersion::V8 => {
                self.send(&v8::cmd::EFFECT_READY, &[])?;
                self.send(
                    &v8::cmd::EFFECT_READY,
                    &[Patch::new(
                        v8::EFFECT_OFFSET,
                        vec![
                            fx.effect,
                            fx.color1.r,
                            fx.color1.g,
                            fx.color1.b,
                            fx.color2.r,
                            fx.color2.g,
                            fx.color2.b,
                            fx.tempo,
                            self.bright,
                            1,
                            fx.mode,
                            fx.color_count,
                        ],
                    )],
                )?;
                thread::sleep(timing::V8_EFFECT_DELAY);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Raw status byte; zero on generations without a status query.
    pub fn get_device_status(&mut self) -> Result<u8, EngineError> {
        let mut buf = vec![0u8; self.report_length];
        buf[0] = self.version.report_id();
        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 => {
                self.send(&v1::cmd::STATUS, &[])?;
                self.transport.get_input_report(&mut buf)?;
                Ok(buf[0])
            }
            ProtocolVersion::V4 => {
                self.transport.get_input_report(&mut buf)?;
                Ok(buf[2])
            }
            ProtocolVersion::V5 => {
                self.send(&v5::cmd::STATUS, &[])?;
                self.transport.get_feature_report(&mut buf)?;
                Ok(buf[2])
            }
            _ => Ok(0),
        }
    }

    pub fn is_device_ready(&mut self) -> Result<Readiness, EngineError> {
        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 => {
                if self.get_device_status()? == v1::status::READY {
                    Ok(Readiness::Ready)
                } else {
                    // a wedged v1 controller only recovers via reset
                    self.reset()?;
                    Ok(Readiness::Busy)
                }
            }
            ProtocolVersion::V4 => {
                let status = self.get_device_status()?;
                Ok(if status == 0 {
                    Readiness::Stalled
                } else if status == v4::status::BUSY {
                    Readiness::Busy
                } else {
                    Readiness::Ready
                })
            }
            ProtocolVersion::V5 => Ok(if self.get_device_status()? == v5::status::WAIT_UPDATE {
                Readiness::Busy
            } else {
                Readiness::Ready
            }),
            _ => Ok(Readiness::Ready),
        }
    }

    /// Poll until the controller accepts commands again. Returns false
    /// when the poll cap runs out.
    pub fn wait_for_ready(&mut self) -> Result<bool, EngineError> {
        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 => {
                PollPolicy::new(timing::V1_POLL_INTERVAL, timing::V1_POLL_MAX)
                    .wait(|| Ok(self.get_device_status()? == v1::status::READY))
            }
            ProtocolVersion::V4 => {
                PollPolicy::new(timing::V4_READY_INTERVAL, timing::V4_READY_MAX_POLLS)
                    .wait(|| Ok(self.is_device_ready()? != Readiness::Busy))
            }
            ProtocolVersion::V5 => {
                PollPolicy::new(timing::V1_POLL_INTERVAL, timing::V1_POLL_MAX)
                    .wait(|| Ok(self.is_device_ready()? == Readiness::Ready))
            }
            _ => Ok(true),
        }
    }

    /// Poll until the controller acknowledges work in progress.
    pub fn wait_for_busy(&mut self) -> Result<bool, EngineError> {
        match self.version {
            ProtocolVersion::V2 | ProtocolVersion::V3 => {
                PollPolicy::new(timing::V1_POLL_INTERVAL, timing::V1_POLL_MAX)
                    .wait(|| Ok(self.get_device_status()? == v1::status::BUSY))
            }
            ProtocolVersion::V4 => {
                // the revised controller never reports busy at all
                if self.pid == v4::PID_NO_BUSY {
                    return Ok(true);
                }
                PollPolicy::new(timing::V4_BUSY_INTERVAL, timing::V4_BUSY_MAX)
                    .wait(|| Ok(self.get_device_status()? == v4::status::BUSY))
            }
            _ => Ok(true),
        }
    }

    // ---- v1 family (V2/V3) ----

    fn v1_light_mask(&self, lights: &[u8]) -> Result<PackedColor, EngineError> {
        let mut mask = 0u32;
        for &light in lights {
            if light >= V1_MAX_LIGHTS {
                return Err(EngineError::LightOutOfRange(light));
            }
            mask |= 1 << light;
        }
        Ok(PackedColor::from_bits(mask))
    }

    /// Opcode + chain + 3 mask bytes, then the generation's color image.
    fn v1_color_patches(&self, mask: PackedColor, op: u8, c1: Color, c2: Color) -> Vec<Patch> {
        let [mr, mg, mb] = mask.mask_bytes();
        let colors = match self.version {
            ProtocolVersion::V2 => vec![
                (c1.r & 0xf0) | (c1.g >> 4),
                (c1.b & 0xf0) | (c2.r >> 4),
                (c2.g & 0xf0) | (c2.b >> 4),
            ],
            _ => vec![c1.r, c1.g, c1.b, c2.r, c2.g, c2.b],
        };
        vec![
            Patch::new(1, vec![op, self.chain, mr, mg, mb]),
            Patch::new(6, colors),
        ]
    }

    /// One staged chain group: color command, chain close, next chain.
    fn v1_stage_color(
        &mut self,
        mask: PackedColor,
        op: u8,
        c1: Color,
        c2: Color,
    ) -> Result<(), EngineError> {
        let patches = self.v1_color_patches(mask, op, c1, c2);
        self.send(&v1::cmd::COLOR, &patches)?;
        self.send(&v1::cmd::LOOP, &[])?;
        self.chain = self.chain.wrapping_add(1);
        Ok(())
    }

    fn v1_set_action(&mut self, block: &LightBlock, first: ActionPhase) -> Result<(), EngineError> {
        if block.light >= V1_MAX_LIGHTS {
            return Err(EngineError::LightOutOfRange(block.light));
        }
        if !matches!(first.kind, ActionKind::Color | ActionKind::Power) {
            // animated programs get their tempo set up front
            let tempo = u16::from(first.tempo) << 3;
            let time = u16::from(first.time) << 5;
            self.send(
                &v1::cmd::SET_TEMPO,
                &[Patch::new(
                    2,
                    vec![
                        (tempo >> 8) as u8,
                        tempo as u8,
                        (time >> 8) as u8,
                        time as u8,
                    ],
                )],
            )?;
            self.send(&v1::cmd::LOOP, &[])?;
        }
        let mask = PackedColor::light_mask(block.light);
        for (i, phase) in block.phases.iter().enumerate() {
            // phases pair with the next one, wrapping to the front; a
            // lone phase pairs with black
            let next = if block.phases.len() > 1 {
                block.phases[(i + 1) % block.phases.len()].color
            } else {
                Color::BLACK
            };
            let op = catalog::v1_op_code(phase.kind);
            let patches = self.v1_color_patches(mask, op, phase.color, next);
            self.send(&v1::cmd::COLOR, &patches)?;
        }
        self.send(&v1::cmd::LOOP, &[])?;
        self.chain = self.chain.wrapping_add(1);
        Ok(())
    }

    fn v1_power_action(&mut self, blocks: &[LightBlock], save: bool) -> Result<(), EngineError> {
        self.begin_set()?;
        let power = blocks.iter().find(|b| is_power_block(b));
        for block in blocks {
            if !is_power_block(block) {
                self.v1_save_block(1, block, false, false, false)?;
            }
        }
        let Some(power) = power else {
            // only slot-1 programs were stored; commit them
            self.send(&v1::cmd::SAVE, &[])?;
            self.reset()?;
            return Ok(());
        };

        if blocks.len() > 1 {
            // commit the slot-1 programs before touching power slots
            self.send(&v1::cmd::SAVE, &[])?;
            self.reset()?;
        }
        self.chain = 1;

        if save {
            let ac = power.phases[0];
            let batt = power.phases[power.phases.len() - 1];
            let pair = |k1: ActionKind, c1: Color, k2: ActionKind, c2: Color| LightBlock {
                light: power.light,
                phases: vec![
                    ActionPhase { kind: k1, time: 0, tempo: 0, color: c1 },
                    ActionPhase { kind: k2, time: 0, tempo: 0, color: c2 },
                ],
            };
            // The controller keeps six power-state slots: AC standby,
            // AC power, charge, battery standby, battery, battery
            // critical. The standby slots also store the inverse mask
            // (the rest of the machine dark in that state).
            let morph = ActionKind::Morph;
            self.v1_save_block(2, &pair(morph, ac.color, morph, Color::BLACK), true, true, true)?;
            self.v1_save_block(
                5,
                &pair(ActionKind::Color, ac.color, morph, Color::BLACK),
                false,
                false,
                true,
            )?;
            self.v1_save_block(6, &pair(morph, ac.color, morph, batt.color), true, false, true)?;
            self.v1_save_block(
                7,
                &pair(morph, batt.color, morph, Color::BLACK),
                true,
                true,
                true,
            )?;
            self.v1_save_block(
                8,
                &pair(ActionKind::Color, batt.color, morph, Color::BLACK),
                false,
                false,
                true,
            )?;
            self.v1_save_block(
                9,
                &pair(ActionKind::Pulse, batt.color, morph, Color::BLACK),
                false,
                false,
                true,
            )?;
        }

        // put the live AC color back on top of whatever slot state the
        // controller is showing
        let front = power.phases[0];
        self.v1_stage_color(
            PackedColor::light_mask(power.light),
            catalog::v1_op_code(front.kind),
            front.color,
            Color::BLACK,
        )?;
        self.update_colors()?;
        Ok(())
    }

    /// Store one program into a power-state save slot. `secondary`
    /// stores the block again with its two phases swapped, `inverse`
    /// adds a black program for every other light, `commit` writes the
    /// slot to EEPROM and resets.
    fn v1_save_block(
        &mut self,
        slot: u8,
        block: &LightBlock,
        secondary: bool,
        inverse: bool,
        commit: bool,
    ) -> Result<(), EngineError> {
        if block.light >= V1_MAX_LIGHTS {
            return Err(EngineError::LightOutOfRange(block.light));
        }
        let select = [Patch::new(2, vec![slot])];
        let mask = PackedColor::light_mask(block.light);
        let front = block.phases[0];
        let back = if block.phases.len() > 1 {
            Some(block.phases[block.phases.len() - 1])
        } else {
            None
        };
        let back_color = back.map(|p| p.color).unwrap_or(Color::BLACK);

        self.send(&v1::cmd::SAVE_GROUP, &select)?;
        let patches =
            self.v1_color_patches(mask, catalog::v1_op_code(front.kind), front.color, back_color);
        self.send(&v1::cmd::COLOR, &patches)?;
        if secondary {
            if let Some(back) = back {
                self.send(&v1::cmd::SAVE_GROUP, &select)?;
                let patches = self.v1_color_patches(
                    mask,
                    catalog::v1_op_code(back.kind),
                    back.color,
                    front.color,
                );
                self.send(&v1::cmd::COLOR, &patches)?;
            }
        }
        if inverse {
            self.send(&v1::cmd::SAVE_GROUP, &select)?;
            self.send(&v1::cmd::LOOP, &[])?;
            self.chain = self.chain.wrapping_add(1);
            self.send(&v1::cmd::SAVE_GROUP, &select)?;
            let patches = self.v1_color_patches(
                PackedColor::inverse_light_mask(block.light),
                v1::op::COLOR,
                Color::BLACK,
                Color::BLACK,
            );
            self.send(&v1::cmd::COLOR, &patches)?;
        }
        self.send(&v1::cmd::SAVE_GROUP, &select)?;
        self.send(&v1::cmd::LOOP, &[])?;
        self.chain = self.chain.wrapping_add(1);

        if commit {
            self.send(&v1::cmd::SAVE, &[])?;
            self.reset()?;
        }
        Ok(())
    }

    // ---- V4 ----

    fn v4_stage_one_color(&mut self, lights: &[u8], color: Color) -> Result<(), EngineError> {
        self.send(
            &v4::cmd::SET_ONE_COLOR,
            &[
                Patch::new(3, vec![color.r, color.g, color.b, 0, lights.len() as u8]),
                Patch::new(8, lights.to_vec()),
            ],
        )
    }

    fn v4_set_action(&mut self, block: &LightBlock) -> Result<(), EngineError> {
        self.send(&v4::cmd::COLOR_SEL, &[Patch::new(6, vec![block.light])])?;
        let mut patches = Vec::new();
        let mut pos = v4::RECORD_OFFSET;
        for phase in &block.phases {
            if pos + v4::RECORD_STRIDE > self.report_length {
                break;
            }
            patches.push(Patch::new(pos, v4_record(phase)));
            pos += v4::RECORD_STRIDE;
        }
        self.send(&v4::cmd::COLOR_SET, &patches)
    }

    fn v4_power_action(&mut self, blocks: &[LightBlock], save: bool) -> Result<(), EngineError> {
        self.update_colors()?;
        if save {
            // EEPROM write: frame the whole non-power set into the save
            // group instead of sweeping the power slots
            let frame = |flag: u8| Patch::new(4, vec![flag, 0, v4::POWER_SAVE_GROUP]);
            self.send(&v4::cmd::CONTROL, &[frame(4)])?;
            self.send(&v4::cmd::CONTROL, &[frame(1)])?;
            for block in blocks {
                if !is_power_block(block) {
                    self.v4_set_action(block)?;
                }
            }
            self.send(&v4::cmd::CONTROL, &[frame(2)])?;
            self.send(&v4::cmd::CONTROL, &[frame(6)])?;
            return Ok(());
        }

        let Some(power) = blocks.first() else {
            return Ok(());
        };
        let ac = power.phases[0];
        let batt = power.phases[power.phases.len() - 1];
        let sleep_off = ActionPhase {
            kind: ActionKind::Power,
            time: 3,
            tempo: 0x64,
            color: Color::BLACK,
        };
        let retyped = |p: ActionPhase, kind: ActionKind| ActionPhase { kind, ..p };
        for &slot in &v4::POWER_SLOTS {
            // AC sleep, AC power, charge, battery sleep, battery power,
            // battery critical
            let phases = match slot {
                0x5b => vec![ac, sleep_off],
                0x5c => vec![retyped(ac, ActionKind::Color)],
                0x5d => vec![ac, batt],
                0x5e => vec![batt, sleep_off],
                0x5f => vec![retyped(batt, ActionKind::Color)],
                _ => vec![retyped(batt, ActionKind::Pulse)],
            };
            let program = LightBlock {
                light: power.light,
                phases,
            };
            self.send(&v4::cmd::SET_POWER, &[Patch::new(4, vec![4, 0, slot])])?;
            self.send(&v4::cmd::SET_POWER, &[Patch::new(4, vec![1, 0, slot])])?;
            self.v4_set_action(&program)?;
            self.send(&v4::cmd::SET_POWER, &[Patch::new(4, vec![2, 0, slot])])?;
        }
        self.send(&v4::cmd::CONTROL, &[Patch::new(4, vec![5])])?;
        self.wait_for_busy()?;
        Ok(())
    }

    // ---- V5 ----

    fn v5_blocks_per_packet(&self) -> usize {
        (self.report_length - v5::BLOCK_OFFSET) / v5::BLOCK_STRIDE
    }

    // ---- V6 ----

    /// One XOR-checksummed command block. `group` is whatever goes in
    /// the index byte: a bit mask of light indexes folded into one byte
    /// for multi-light colors, the raw light index for a single action.
    fn v6_stage(
        &mut self,
        group: u8,
        phase: &ActionPhase,
        second: Option<Color>,
    ) -> Result<(), EngineError> {
        let c1 = phase.color;
        let mut mask = c1.r ^ c1.g ^ c1.b ^ group;
        let op = v6::OP_CODES[phase.kind.index()];
        let tcode = v6::T_CODES[phase.kind.index()];
        let mut command = vec![
            v6::BLOCK_MAGIC,
            op,
            v6::BLOCK_TAG,
            tcode,
            group,
            c1.r,
            c1.g,
            c1.b,
        ];
        match phase.kind {
            ActionKind::Color | ActionKind::Power => {
                mask ^= v6::mask_flip::COLOR;
                command.extend([self.bright, mask]);
            }
            ActionKind::Pulse => {
                mask ^= phase.tempo ^ v6::mask_flip::PULSE_BASE;
                command.extend([self.bright, phase.tempo, mask]);
            }
            ActionKind::Morph
            | ActionKind::Breathing
            | ActionKind::Spectrum
            | ActionKind::Rainbow => {
                // breathing is a morph to black
                let c2 = if phase.kind == ActionKind::Breathing {
                    Color::BLACK
                } else {
                    second.unwrap_or(Color::BLACK)
                };
                mask ^= c2.r ^ c2.g ^ c2.b ^ phase.tempo ^ v6::mask_flip::MORPH;
                command.extend([c2.r, c2.g, c2.b, self.bright, 2, phase.tempo, mask]);
            }
        }
        let len = command.len() as u8;
        self.send(
            &v6::cmd::COLOR_SET,
            &[
                Patch::new(v6::LENGTH_OFFSET, vec![len, 0]),
                Patch::new(v6::BLOCK_OFFSET, command),
            ],
        )
    }

    // ---- V7 ----

    fn v7_stage(&mut self, light: u8, phases: &[ActionPhase]) -> Result<(), EngineError> {
        let op = v7::OP_CODES[phases[0].kind.index()];
        let mut patches = vec![Patch::new(v7::HEADER_OFFSET, vec![op, self.bright, light])];
        for (i, phase) in phases.iter().take(v7::MAX_PHASES).enumerate() {
            let pos = i * 3 + v7::COLOR_OFFSET;
            if pos + 2 >= self.report_length {
                break;
            }
            patches.push(Patch::new(
                pos,
                vec![phase.color.r, phase.color.g, phase.color.b],
            ));
        }
        self.send(&v7::cmd::CONTROL, &patches)
    }

    // ---- V8 ----

    fn v8_blocks_per_packet(&self) -> usize {
        // last block needs BLOCK_LEN bytes, earlier ones a full stride
        (self.report_length - v8::BLOCK_OFFSET - v8::BLOCK_LEN) / v8::BLOCK_STRIDE + 1
    }

    /// The begin/data split: the total block count goes out first as a
    /// feature report, then the blocks follow in plain writes numbered
    /// from 1 at the sequence byte.
    fn v8_send_blocks(&mut self, blocks: &[Vec<u8>]) -> Result<(), EngineError> {
        self.send(
            &v8::cmd::READY_TO_COLOR,
            &[Patch::new(v8::BEGIN_OFFSET, vec![blocks.len() as u8])],
        )?;
        for (seq, chunk) in blocks.chunks(self.v8_blocks_per_packet()).enumerate() {
            let mut patches = Vec::with_capacity(chunk.len() + 1);
            let mut pos = v8::BLOCK_OFFSET;
            for block in chunk {
                patches.push(Patch::new(pos, block.clone()));
                pos += v8::BLOCK_STRIDE;
            }
            patches.push(Patch::new(v8::COUNT_OFFSET, vec![seq as u8 + 1]));
            self.send(&v8::cmd::READY_TO_COLOR, &patches)?;
        }
        Ok(())
    }
}

fn is_power_block(block: &LightBlock) -> bool {
    block.phases.first().map(|p| p.kind) == Some(ActionKind::Power)
}

fn v4_record(phase: &ActionPhase) -> Vec<u8> {
    let idx = phase.kind.index();
    vec![
        (idx as u8).min(v4::RECORD_TYPE_CAP),
        phase.time,
        v4::OP_CODES[idx],
        0,
        if phase.kind == ActionKind::Color {
            v4::COLOR_HOLD
        } else {
            phase.tempo
        },
        phase.color.r,
        phase.color.g,
        phase.color.b,
    ]
}

/// 13-byte V8 data block: light, opcode, tempo and the two colors
fn v8_data_block(block: &LightBlock) -> Vec<u8> {
    let p1 = block.phases[0];
    let c2 = block.phases.get(1).map(|p| p.color).unwrap_or(Color::BLACK);
    vec![
        block.light,
        v8::OP_CODES[p1.kind.index()],
        p1.tempo,
        v8::BLOCK_TAG,
        p1.time,
        v8::BLOCK_SUB_TAG,
        p1.color.r,
        p1.color.g,
        p1.color.b,
        c2.r,
        c2.g,
        c2.b,
        v8::BLOCK_TRAILER,
    ]
}
