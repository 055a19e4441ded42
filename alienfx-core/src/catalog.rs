//! Protocol catalog: the per-generation constants
//!
//! Seven controller generations share nothing on the wire except the
//! overall shape "command templates + byte patches". Everything
//! generation-specific lives here as plain data: command templates in
//! Pascal form (byte 0 is the payload length, the payload starts at the
//! report-ID slot), opcode tables indexed by [`ActionKind`], report IDs,
//! brightness scales, status bytes, and timing constants. The builder
//! and engine stay free of magic numbers.

use crate::action::ActionKind;

/// Protocol generation of a lighting controller
///
/// Numbering is historical; there is no V1 on current hardware. V2/V3
/// share the "v1 command family" encoding and differ only in packet
/// size and color depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// 9-byte packets, nibble-packed colors
    V2,
    /// 12-byte packets, full-byte colors
    V3,
    /// 34-byte packets, chained action records
    V4,
    /// 65-byte feature reports (Darfon)
    V5,
    /// 65-byte interrupt packets, XOR-masked commands (Microchip)
    V6,
    /// 65-byte write+read packets (Primax)
    V7,
    /// 65-byte two-phase feature/write packets (Chicony)
    V8,
}

impl ProtocolVersion {
    pub fn name(&self) -> &'static str {
        match self {
            Self::V2 => "V2",
            Self::V3 => "V3",
            Self::V4 => "V4",
            Self::V5 => "V5",
            Self::V6 => "V6",
            Self::V7 => "V7",
            Self::V8 => "V8",
        }
    }

    /// Report ID injected at byte 0 of every packet. Zero means the
    /// generation has no physical report-ID byte and the builder takes
    /// the shift path.
    pub fn report_id(&self) -> u8 {
        match self {
            Self::V2 | Self::V3 | Self::V4 | Self::V8 => 0x02,
            Self::V5 => 0xcc,
            Self::V6 | Self::V7 => 0x00,
        }
    }

    /// Hardware brightness range: percent-scaled generations top out at
    /// 0x64, byte-scaled ones at 0xff.
    pub fn brightness_scale(&self) -> u8 {
        match self {
            Self::V6 | Self::V7 => 0xff,
            _ => 0x64,
        }
    }

    /// Unused packet bytes: V6 controllers require 0xff padding, the
    /// rest take zeros.
    pub fn fill_byte(&self) -> u8 {
        match self {
            Self::V6 => 0xff,
            _ => 0x00,
        }
    }

    pub const ALL: [ProtocolVersion; 7] = [
        Self::V2,
        Self::V3,
        Self::V4,
        Self::V5,
        Self::V6,
        Self::V7,
        Self::V8,
    ];
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// v1 command family (V2/V3): single-byte commands after the report ID
pub mod v1 {
    /// Effect opcodes written at byte 1 of a color command
    pub mod op {
        pub const MORPH: u8 = 0x01;
        pub const BLINK: u8 = 0x02;
        pub const COLOR: u8 = 0x03;
    }

    pub mod cmd {
        /// Reset; byte 2 selects the variant (`reset` module)
        pub const RESET: [u8; 4] = [3, 0x02, 0x07, 0x04];
        /// Color/morph/blink command; opcode, chain and mask patched in
        pub const COLOR: [u8; 3] = [2, 0x02, 0x03];
        /// Close the current command chain
        pub const LOOP: [u8; 3] = [2, 0x02, 0x04];
        /// Execute everything staged since the last reset
        pub const UPDATE: [u8; 3] = [2, 0x02, 0x05];
        /// Request a status input report
        pub const STATUS: [u8; 3] = [2, 0x02, 0x06];
        /// Select a power-mode save slot; byte 2 is the slot ID
        pub const SAVE_GROUP: [u8; 4] = [3, 0x02, 0x08, 0x01];
        /// Commit save slots to EEPROM
        pub const SAVE: [u8; 3] = [2, 0x02, 0x09];
        /// Global effect tempo; bytes 2..6 are tempo<<3, time<<5 (BE)
        pub const SET_TEMPO: [u8; 3] = [2, 0x02, 0x0e];
        /// Dim level; byte 2 is the brightness on the 0x64 scale
        pub const DIM: [u8; 4] = [3, 0x02, 0x0d, 0x00];
    }

    /// Reset variants (byte 2 of `cmd::RESET`)
    pub mod reset {
        /// Only the touch-control strip goes dark
        pub const TOUCH_CONTROLS: u8 = 0x01;
        pub const ALL_OFF: u8 = 0x03;
        pub const ALL_ON: u8 = 0x04;
    }

    pub mod status {
        pub const READY: u8 = 0x10;
        pub const BUSY: u8 = 0x11;
        pub const UNKNOWN: u8 = 0x12;
    }
}

/// V4 command family: chained 8-byte action records
pub mod v4 {
    /// Per-action third record byte (ramp steepness)
    pub const OP_CODES: [u8; 7] = [0xd0, 0xdc, 0xcf, 0xcf, 0xcf, 0xcf, 0xd0];

    pub mod cmd {
        /// Controller reset / mode control
        pub const CONTROL: [u8; 5] = [4, 0x02, 0x21, 0x00, 0x03];
        /// Power-mode slot write; phase flag at byte 4, slot ID at byte 6
        pub const SET_POWER: [u8; 4] = [3, 0x02, 0x22, 0x00];
        /// Select the light an action chain applies to (byte 6)
        pub const COLOR_SEL: [u8; 7] = [6, 0x02, 0x23, 0x01, 0x00, 0x01, 0x00];
        /// Carry action records (8-byte each, from byte 3)
        pub const COLOR_SET: [u8; 4] = [3, 0x02, 0x24, 0x00];
        /// One color to many lights: rgb+count at 3, light IDs from 8
        pub const SET_ONE_COLOR: [u8; 4] = [3, 0x02, 0x27, 0x00];
        /// Brightness: dim level/count at 3, light IDs from 6
        pub const TURN_ON: [u8; 4] = [3, 0x02, 0x26, 0x00];
    }

    /// First byte of an action record; effects above Morph ramp like Morph
    pub const RECORD_TYPE_CAP: u8 = 2;
    /// `time` byte used for static colors
    pub const COLOR_HOLD: u8 = 0xfa;
    /// Action records start here and advance by 8
    pub const RECORD_OFFSET: usize = 3;
    pub const RECORD_STRIDE: usize = 8;

    /// Power-mode slot command IDs, written in this order
    pub const POWER_SLOTS: [u8; 6] = [0x5b, 0x5c, 0x5d, 0x5e, 0x5f, 0x60];
    /// Save-group ID framing an EEPROM profile write
    pub const POWER_SAVE_GROUP: u8 = 0x61;

    pub mod status {
        pub const READY: u8 = 33;
        pub const BUSY: u8 = 34;
        pub const WAIT_COLOR: u8 = 35;
        pub const WAIT_UPDATE: u8 = 36;
        pub const WAS_ON: u8 = 38;
    }

    /// PID of the revised controller that never reports busy
    pub const PID_NO_BUSY: u16 = 0x0551;
}

/// V5 command family (Darfon, feature reports)
pub mod v5 {
    pub mod cmd {
        pub const RESET: [u8; 3] = [2, 0xcc, 0x94];
        /// Color data blocks (4 bytes each) from byte 4, count at byte 3
        pub const COLOR_SET: [u8; 4] = [3, 0xcc, 0x8c, 0x02];
        pub const LOOP: [u8; 4] = [3, 0xcc, 0x8c, 0x12];
        pub const UPDATE: [u8; 4] = [3, 0xcc, 0x8b, 0xff];
        pub const STATUS: [u8; 3] = [2, 0xcc, 0x93];
        /// Brightness at byte 4
        pub const TURN_ON_SET: [u8; 5] = [4, 0xcc, 0x8f, 0x01, 0x64];
        /// Global effect select; effect/tempo at 2, colors at 9
        pub const SET_EFFECT: [u8; 3] = [2, 0xcc, 0x95];
    }

    pub const BLOCK_OFFSET: usize = 4;
    pub const BLOCK_STRIDE: usize = 4;
    pub const COUNT_OFFSET: usize = 3;

    pub mod status {
        pub const START_COMMAND: u8 = 0x8c;
        pub const WAIT_UPDATE: u8 = 0x80;
        pub const IN_COMMAND: u8 = 0xcc;
    }

    /// byte 2 payload that turns global effects off
    pub const EFFECT_OFF: [u8; 2] = [0x01, 0xfe];
}

/// V6 command family (Microchip, XOR-masked interrupt packets)
pub mod v6 {
    pub const OP_CODES: [u8; 7] = [0x10, 0x1c, 0x18, 0x18, 0x18, 0x18, 0x10];
    /// Fourth command byte per action
    pub const T_CODES: [u8; 7] = [0x00, 0x02, 0x03, 0x03, 0x03, 0x03, 0x00];

    pub mod cmd {
        /// Command block carrier: length at byte 3, block from byte 5
        pub const COLOR_SET: [u8; 4] = [3, 0x00, 0x94, 0x01];
        pub const SYSTEM_RESET: [u8; 5] = [4, 0x00, 0x94, 0x02, 0xff];
    }

    /// Leading byte of every command block
    pub const BLOCK_MAGIC: u8 = 0x51;
    /// Third byte of every command block
    pub const BLOCK_TAG: u8 = 0xd0;
    pub const LENGTH_OFFSET: usize = 3;
    pub const BLOCK_OFFSET: usize = 5;

    /// XOR flip applied to the trailing mask byte per action
    pub mod mask_flip {
        pub const COLOR: u8 = 0x08;
        pub const MORPH: u8 = 0x04;
        pub const PULSE_BASE: u8 = 0x01;
    }
}

/// V7 command family (Primax, write+read interrupt packets)
pub mod v7 {
    pub const OP_CODES: [u8; 7] = [0x01, 0x02, 0x03, 0x03, 0x03, 0x03, 0x01];

    pub mod cmd {
        /// Control packet: op/brightness/light at byte 5, colors from 8
        pub const CONTROL: [u8; 6] = [5, 0x00, 0x03, 0x02, 0x00, 0x01];
    }

    pub const HEADER_OFFSET: usize = 5;
    pub const COLOR_OFFSET: usize = 8;
    /// A control packet carries at most this many color phases
    pub const MAX_PHASES: usize = 3;
}

/// V8 command family (Chicony, two-phase feature/write protocol)
pub mod v8 {
    pub const OP_CODES: [u8; 7] = [0x01, 0x02, 0x03, 0x04, 0x04, 0x04, 0x01];

    pub mod cmd {
        /// Begin (1-byte patch, feature) or carry data blocks (write)
        pub const READY_TO_COLOR: [u8; 3] = [2, 0x02, 0x71];
        /// Global effect arm/config
        pub const EFFECT_READY: [u8; 3] = [2, 0x02, 0x87];
        /// Brightness at byte 2
        pub const SET_BRIGHTNESS: [u8; 3] = [2, 0x02, 0x7b];
    }

    pub const BEGIN_OFFSET: usize = 2;
    pub const COUNT_OFFSET: usize = 4;
    pub const BLOCK_OFFSET: usize = 5;
    pub const BLOCK_STRIDE: usize = 15;
    pub const BLOCK_LEN: usize = 13;

    /// Fixed bytes inside a 13-byte data block
    pub const BLOCK_TAG: u8 = 0xa5;
    pub const BLOCK_SUB_TAG: u8 = 0x0a;
    pub const BLOCK_TRAILER: u8 = 0x02;

    /// Effect config payload offset in `EFFECT_READY`
    pub const EFFECT_OFFSET: usize = 3;
}

/// Poll intervals and caps, plus the V8 transfer delays
pub mod timing {
    use std::time::Duration;

    /// v1-family ready/busy polls: 100 x 10ms
    pub const V1_POLL_INTERVAL: Duration = Duration::from_millis(10);
    pub const V1_POLL_MAX: u32 = 100;

    /// V4 ready poll; the cap is deliberate, the hardware loop used to
    /// be unbounded and a wedged controller would spin forever
    pub const V4_READY_INTERVAL: Duration = Duration::from_millis(20);
    pub const V4_READY_MAX_POLLS: u32 = 1500;

    pub const V4_BUSY_INTERVAL: Duration = Duration::from_millis(20);
    pub const V4_BUSY_MAX: u32 = 500;

    /// V8 feature writes need guard time on both sides
    pub const V8_FEATURE_PRE_DELAY: Duration = Duration::from_millis(3);
    pub const V8_FEATURE_POST_DELAY: Duration = Duration::from_millis(6);
    /// Settle time after a V8 global-effect config
    pub const V8_EFFECT_DELAY: Duration = Duration::from_micros(20);
}

/// v1-family opcode for an action kind
pub fn v1_op_code(kind: ActionKind) -> u8 {
    match kind {
        ActionKind::Color | ActionKind::Power => v1::op::COLOR,
        ActionKind::Pulse => v1::op::BLINK,
        _ => v1::op::MORPH,
    }
}
