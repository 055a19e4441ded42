//! AlienFX lighting protocol core
//!
//! Alienware machines shipped seven incompatible generations of RGB
//! lighting controllers. This crate turns one uniform API - colors,
//! action programs, brightness, power-state persistence - into each
//! generation's wire encoding and transfer sequence:
//!
//! - [`probe`] classifies a USB device into a [`catalog::ProtocolVersion`]
//! - [`catalog`] carries the per-generation templates, opcodes and timing
//! - [`builder`] assembles packets from templates and byte patches
//! - [`engine`] sequences a single device
//! - [`registry`] tracks the device set across bus re-scans

pub mod action;
pub mod builder;
pub mod catalog;
pub mod color;
pub mod engine;
pub mod error;
pub mod poll;
pub mod probe;
pub mod registry;

pub use action::{light_flags, ActionKind, ActionPhase, LightBlock, MappedLight};
pub use catalog::ProtocolVersion;
pub use color::{Color, PackedColor};
pub use engine::{GlobalEffect, ProtocolEngine, Readiness};
pub use error::EngineError;
pub use probe::{classify, ClassifiedDevice};
pub use registry::{DeviceRegistry, RegisteredDevice};
