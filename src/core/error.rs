use thiserror::Error;

use crate::core::types::StructureId;
use crate::world::placement::PlacementOutcome;

#[derive(Error, Debug)]
pub enum ColonyError {
    #[error("Structure not found: {0:?}")]
    StructureNotFound(StructureId),

    #[error("Placement rejected: {0:?}")]
    Placement(PlacementOutcome),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Game is over")]
    GameOver,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ColonyError>;
