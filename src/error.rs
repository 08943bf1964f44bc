//! Error types for the mnemonic finder

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum FinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Derivation error: {0}")]
    Derivation(#[from] DerivationError),

    #[error("Log sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors, all fatal before the search starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid phrase length: {0}. Must be at least 1")]
    InvalidPhraseLength(usize),

    #[error("Empty word slot at position {0}")]
    EmptyWordSlot(usize),

    #[error("Missing word slot for position {0}")]
    MissingWordSlot(usize),

    #[error("Duplicate word slot for position {0}")]
    DuplicateWordSlot(usize),

    #[error("Word slot position {position} exceeds phrase length {length}")]
    SlotOutOfRange { position: usize, length: usize },

    #[error("Invalid word in slot: {0}")]
    InvalidWord(String),

    #[error("Fixed phrase is set but empty")]
    EmptyFixedPhrase,

    #[error("Passphrase list is empty (use a single empty string for no passphrase)")]
    NoPassphrases,

    #[error("No derivation scheme enabled")]
    NoSchemeEnabled,

    #[error("Path scheme enabled with an empty path list")]
    EmptyPathList,

    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    #[error("Address count must be greater than 0")]
    InvalidAddressCount,

    #[error("Target set is empty")]
    EmptyTargetSet,

    #[error("Invalid target address: {0}")]
    InvalidTargetAddress(String),

    #[error("Invalid worker count: {0}. Must be greater than 0")]
    InvalidWorkerCount(usize),

    #[error("Invalid queue capacity: {0}. Must be greater than 0")]
    InvalidQueueCapacity(usize),

    #[error("Invalid poll interval: {0} ms. Must be greater than 0")]
    InvalidPollInterval(u64),

    #[error("Invalid rotation size: {0}. Must be greater than 0")]
    InvalidRotationSize(u64),

    #[error("Invalid backup count: {0}. Must be greater than 0")]
    InvalidBackupCount(usize),

    #[error("Search space too large: {0} combinations")]
    SearchSpaceTooLarge(u64),
}

/// Key derivation errors
///
/// A checksum rejection is not an error and never reaches this type; anything
/// that does indicates a malformed configuration and aborts the run.
#[derive(Error, Debug)]
pub enum DerivationError {
    #[error("BIP32 derivation error: {0}")]
    Bip32(#[from] bitcoin::bip32::Error),

    #[error("PBKDF2 error: {0}")]
    Pbkdf2(String),

    #[error("Secp256k1 error: {0}")]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
}

/// Result-log sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to open log file {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write log record: {0}")]
    Write(#[from] std::io::Error),

    #[error("Log rotation failed: {0}")]
    Rotate(std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FinderError>;
