use thiserror::Error;

use crate::core::types::{BattleId, UnitId};

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Invalid roster entry: {0}")]
    InvalidRoster(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Battle {0} has been torn down")]
    BattleTornDown(BattleId),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;
