use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid snapshot: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown package manager: {0}")]
    UnknownPackageManager(String),

    #[error("canon {0} is not part of the dependency graph")]
    UnknownCanon(String),

    #[error("no canon package mapping with id {0}")]
    MissingMapping(String),

    #[error("dependency graph is empty, nothing to rank")]
    EmptyGraph,

    #[error("run cancelled")]
    Cancelled,

    #[error("bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;
