//! Mnemonic Finder
//!
//! A parallel brute-force search for BIP39 mnemonic phrases. Candidates are
//! enumerated lazily from per-position word slots, checksum-filtered, derived
//! under two configurable schemes and compared against a set of target
//! addresses; the whole pipeline shuts down the instant any worker finds a
//! match.

pub mod checker;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod generator;
pub mod logsink;
pub mod monitor;

pub use checker::{AddressChecker, MatchEvidence};
pub use config::{
    AccountSchemeConfig, OutputConfig, PathSchemeConfig, SearchConfig, WordSlot,
};
pub use crypto::{AddressEncoding, Bip39Seed, Change, CoinType, CryptoEngine, Derivation};
pub use engine::{SearchEngine, SearchOutcome, StopFlag};
pub use error::*;
pub use generator::{Candidate, CandidateGenerator};
pub use logsink::{LogHandle, LogSink};
pub use monitor::{ProgressSnapshot, SearchMonitor};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::checker::{AddressChecker, MatchEvidence};
    pub use crate::config::{
        AccountSchemeConfig, OutputConfig, PathSchemeConfig, SearchConfig, WordSlot,
    };
    pub use crate::crypto::{
        AddressEncoding, Bip39Seed, Change, CoinType, CryptoEngine, Derivation,
    };
    pub use crate::engine::{SearchEngine, SearchOutcome, StopFlag};
    pub use crate::error::*;
    pub use crate::generator::{Candidate, CandidateGenerator};
    pub use crate::monitor::SearchMonitor;
    pub use anyhow::{Context, Result};
}


/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
