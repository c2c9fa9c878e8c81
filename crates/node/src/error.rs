//! A bunch of wrap errors.

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors of the peer process: setup, configuration and console input.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid logging level: {0}")]
    InvalidLoggingLevel(String),
    #[error("Invalid host: {0}")]
    InvalidHost(String),
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Missing argument for command {0}")]
    MissingArgument(&'static str),
    #[error("Invalid file id: {0}")]
    InvalidFileId(String),
    #[error("Too many arguments for command {0}")]
    TooManyArguments(&'static str),
    #[error("Create File Error: {0}")]
    CreateFileError(String),
    #[error("Open File Error: {0}")]
    OpenFileError(String),
    #[error("Cannot find home directory")]
    HomeDirError,
    #[error("Cannot find parent directory")]
    ParentDirError,
    #[error("Invalid config file: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error),
    #[error("Core error: {0}")]
    CoreError(#[from] ringpeer_core::error::Error),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

impl Error {
    /// Whether the peer has to terminate after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::CoreError(e) => e.is_fatal(),
            _ => false,
        }
    }
}
