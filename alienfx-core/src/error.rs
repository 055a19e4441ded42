//! Engine error types

use thiserror::Error;

use alienfx_transport::TransportError;

/// Errors surfaced by the protocol engine and registry
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("no lights given")]
    EmptyLights,

    #[error("action block for light {light} has no phases")]
    EmptyAction { light: u8 },

    #[error("light index {0} out of mask range")]
    LightOutOfRange(u8),
}
