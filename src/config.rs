//! Configuration types and parsing for the mnemonic search

use crate::crypto::{AddressEncoding, Change, CoinType};
use crate::error::{ConfigError, Result};
use bitcoin::bip32::DerivationPath;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure for a search run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Word slots for each position in the phrase
    #[serde(default)]
    pub word_slots: Vec<WordSlot>,

    /// Length of the phrase in words
    #[serde(default)]
    pub phrase_length: usize,

    /// Optional single fixed phrase checked instead of enumerating slots
    #[serde(default)]
    pub fixed_phrase: Option<String>,

    /// Passphrases combined with every candidate, in order
    #[serde(default = "default_passphrases")]
    pub passphrases: Vec<String>,

    /// Arbitrary-path derivation scheme (disabled when absent)
    #[serde(default)]
    pub path_scheme: Option<PathSchemeConfig>,

    /// Standardized account derivation scheme (disabled when absent)
    #[serde(default)]
    pub account_scheme: Option<AccountSchemeConfig>,

    /// Addresses to search for
    pub targets: Vec<String>,

    /// Number of checker workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the candidate hand-off queue
    #[serde(default = "default_work_queue_capacity")]
    pub work_queue_capacity: usize,

    /// Capacity of the result-log queue
    #[serde(default = "default_log_queue_capacity")]
    pub log_queue_capacity: usize,

    /// Poll timeout used by every blocking loop, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Whether to write a per-candidate trace record for every derivation
    #[serde(default)]
    pub verbose: bool,

    /// Result log location and rotation settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Word slot for a specific position in the phrase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSlot {
    /// Position in the phrase (0-based)
    pub position: usize,

    /// List of possible words for this position
    pub words: Vec<String>,
}

/// Arbitrary-path scheme: derive `addresses_per_path` child addresses
/// under each configured path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSchemeConfig {
    /// Derivation paths, e.g. `m/44'/60'/0'`
    pub paths: Vec<String>,

    /// Child address indices 0..n derived under each path
    pub addresses_per_path: u32,

    /// How derived keys are encoded into addresses
    pub encoding: AddressEncoding,
}

/// Standardized account scheme: `m/44'/coin'/account'/change/index`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSchemeConfig {
    /// Coin selecting both the derivation constant and the address form
    pub coin: CoinType,

    /// Change designation applied to every account
    #[serde(default)]
    pub change: Change,

    /// Account indices 0..n
    pub accounts: u32,

    /// Address indices 0..n per account
    pub addresses_per_account: u32,
}

/// Result log location and rotation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, recreated fresh at startup
    #[serde(default = "default_output_folder")]
    pub folder: PathBuf,

    /// Active log file name inside the output directory
    #[serde(default = "default_output_file_name")]
    pub file_name: String,

    /// Rotate once the active file would exceed this many bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Number of rotated files to retain
    #[serde(default = "default_backup_count")]
    pub backup_count: usize,
}

/// Default functions for serde
fn default_passphrases() -> Vec<String> {
    vec![String::new()]
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_work_queue_capacity() -> usize {
    64 * 1024
}

fn default_log_queue_capacity() -> usize {
    1024
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("results")
}

fn default_output_file_name() -> String {
    "results.log".to_string()
}

fn default_max_file_size() -> u64 {
    1024 * 1024 * 1024
}

fn default_backup_count() -> usize {
    100
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: default_output_folder(),
            file_name: default_output_file_name(),
            max_file_size: default_max_file_size(),
            backup_count: default_backup_count(),
        }
    }
}

impl SearchConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SearchConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SearchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// The run must not start with an invalid configuration, so every check
    /// here happens before any thread is spawned.
    pub fn validate(&self) -> Result<()> {
        match &self.fixed_phrase {
            Some(phrase) => {
                if phrase.trim().is_empty() {
                    return Err(ConfigError::EmptyFixedPhrase.into());
                }
            }
            None => self.validate_word_slots()?,
        }

        if self.passphrases.is_empty() {
            return Err(ConfigError::NoPassphrases.into());
        }

        self.validate_schemes()?;
        self.validate_targets()?;

        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount(self.workers).into());
        }
        if self.work_queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(self.work_queue_capacity).into());
        }
        if self.log_queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(self.log_queue_capacity).into());
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(self.poll_interval_ms).into());
        }
        if self.output.max_file_size == 0 {
            return Err(ConfigError::InvalidRotationSize(self.output.max_file_size).into());
        }
        if self.output.backup_count == 0 {
            return Err(ConfigError::InvalidBackupCount(self.output.backup_count).into());
        }

        Ok(())
    }

    /// Validate word slots
    fn validate_word_slots(&self) -> Result<()> {
        if self.phrase_length == 0 {
            return Err(ConfigError::InvalidPhraseLength(self.phrase_length).into());
        }

        let mut positions: HashMap<usize, &WordSlot> = HashMap::new();

        for slot in &self.word_slots {
            if slot.position >= self.phrase_length {
                return Err(ConfigError::SlotOutOfRange {
                    position: slot.position,
                    length: self.phrase_length,
                }
                .into());
            }

            if slot.words.is_empty() {
                return Err(ConfigError::EmptyWordSlot(slot.position).into());
            }

            for word in &slot.words {
                if word.is_empty() || !word.chars().all(|c| c.is_ascii_lowercase()) {
                    return Err(ConfigError::InvalidWord(word.clone()).into());
                }
            }

            if positions.insert(slot.position, slot).is_some() {
                return Err(ConfigError::DuplicateWordSlot(slot.position).into());
            }
        }

        for i in 0..self.phrase_length {
            if !positions.contains_key(&i) {
                return Err(ConfigError::MissingWordSlot(i).into());
            }
        }

        Ok(())
    }

    /// Validate derivation scheme sections
    fn validate_schemes(&self) -> Result<()> {
        if self.path_scheme.is_none() && self.account_scheme.is_none() {
            return Err(ConfigError::NoSchemeEnabled.into());
        }

        if let Some(scheme) = &self.path_scheme {
            if scheme.paths.is_empty() {
                return Err(ConfigError::EmptyPathList.into());
            }
            if scheme.addresses_per_path == 0 {
                return Err(ConfigError::InvalidAddressCount.into());
            }
            for path in &scheme.paths {
                if DerivationPath::from_str(path).is_err() {
                    return Err(ConfigError::InvalidDerivationPath(path.clone()).into());
                }
            }
        }

        if let Some(scheme) = &self.account_scheme {
            if scheme.accounts == 0 || scheme.addresses_per_account == 0 {
                return Err(ConfigError::InvalidAddressCount.into());
            }
        }

        Ok(())
    }

    /// Validate the target address list
    fn validate_targets(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(ConfigError::EmptyTargetSet.into());
        }

        for target in &self.targets {
            if target.is_empty() {
                return Err(ConfigError::InvalidTargetAddress(target.clone()).into());
            }
            // Hex targets must be well-formed Ethereum addresses; anything
            // else (base58, bech32) is compared byte-exact.
            if target.starts_with("0x") && !is_valid_ethereum_address(target) {
                return Err(ConfigError::InvalidTargetAddress(target.clone()).into());
            }
        }

        Ok(())
    }

    /// Target addresses normalized for comparison
    ///
    /// Ethereum addresses compare case-insensitively, so `0x…` targets are
    /// lowercased to match the encoder's lowercase-hex output.
    pub fn target_set(&self) -> HashSet<String> {
        self.targets
            .iter()
            .map(|t| {
                if t.starts_with("0x") {
                    t.to_lowercase()
                } else {
                    t.clone()
                }
            })
            .collect()
    }

    /// Total number of candidate phrases the enumerator will produce
    pub fn total_combinations(&self) -> u64 {
        if self.fixed_phrase.is_some() {
            return 1;
        }
        self.word_slots
            .iter()
            .fold(1u64, |acc, slot| acc.saturating_mul(slot.words.len() as u64))
    }

    /// Addresses derived per candidate across both schemes and all passphrases
    pub fn addresses_per_candidate(&self) -> u64 {
        let path_addrs = self
            .path_scheme
            .as_ref()
            .map(|s| s.paths.len() as u64 * u64::from(s.addresses_per_path))
            .unwrap_or(0);
        let account_addrs = self
            .account_scheme
            .as_ref()
            .map(|s| u64::from(s.accounts) * u64::from(s.addresses_per_account))
            .unwrap_or(0);
        (path_addrs + account_addrs).saturating_mul(self.passphrases.len() as u64)
    }

    /// Total number of derivable addresses over the whole search space
    pub fn total_addresses(&self) -> u64 {
        self.total_combinations()
            .saturating_mul(self.addresses_per_candidate())
    }

    /// Word slots ordered by position
    pub fn ordered_slots(&self) -> Vec<Vec<String>> {
        let mut slots: Vec<&WordSlot> = self.word_slots.iter().collect();
        slots.sort_by_key(|s| s.position);
        slots.into_iter().map(|s| s.words.clone()).collect()
    }
}

/// Check if an Ethereum address is valid (0x prefix plus 40 hex digits)
fn is_valid_ethereum_address(address: &str) -> bool {
    if !address.starts_with("0x") || address.len() != 42 {
        return false;
    }
    address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FinderError;

    fn base_config() -> SearchConfig {
        SearchConfig {
            word_slots: vec![
                WordSlot {
                    position: 0,
                    words: vec!["abandon".to_string(), "ability".to_string()],
                },
                WordSlot {
                    position: 1,
                    words: vec!["able".to_string(), "about".to_string(), "above".to_string()],
                },
            ],
            phrase_length: 2,
            fixed_phrase: None,
            passphrases: vec![String::new(), "test".to_string()],
            path_scheme: Some(PathSchemeConfig {
                paths: vec!["m/44'/60'/0'".to_string()],
                addresses_per_path: 2,
                encoding: AddressEncoding::Ethereum,
            }),
            account_scheme: Some(AccountSchemeConfig {
                coin: CoinType::Ethereum,
                change: Change::External,
                accounts: 1,
                addresses_per_account: 3,
            }),
            targets: vec!["0x1234567890123456789012345678901234567890".to_string()],
            workers: 2,
            work_queue_capacity: 16,
            log_queue_capacity: 16,
            poll_interval_ms: 50,
            verbose: false,
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_missing_slot_rejected() {
        let mut config = base_config();
        config.phrase_length = 3;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            FinderError::Config(ConfigError::MissingWordSlot(2))
        ));
    }

    #[test]
    fn test_empty_slot_rejected() {
        let mut config = base_config();
        config.word_slots[1].words.clear();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            FinderError::Config(ConfigError::EmptyWordSlot(1))
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = base_config();
        config.workers = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            FinderError::Config(ConfigError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn test_no_scheme_rejected() {
        let mut config = base_config();
        config.path_scheme = None;
        config.account_scheme = None;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            FinderError::Config(ConfigError::NoSchemeEnabled)
        ));
    }

    #[test]
    fn test_malformed_path_rejected() {
        let mut config = base_config();
        config.path_scheme.as_mut().unwrap().paths = vec!["not-a-path".to_string()];
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            FinderError::Config(ConfigError::InvalidDerivationPath(_))
        ));
    }

    #[test]
    fn test_malformed_target_rejected() {
        let mut config = base_config();
        config.targets = vec!["0x123".to_string()];
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            FinderError::Config(ConfigError::InvalidTargetAddress(_))
        ));
    }

    #[test]
    fn test_target_normalization() {
        let mut config = base_config();
        config.targets = vec![
            "0xABCDEFabcdef0123456789ABCDEFabcdef012345".to_string(),
            "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA".to_string(),
        ];
        let set = config.target_set();
        assert!(set.contains("0xabcdefabcdef0123456789abcdefabcdef012345"));
        assert!(set.contains("1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA"));
    }

    #[test]
    fn test_search_space_math() {
        let config = base_config();
        assert_eq!(config.total_combinations(), 6); // 2 * 3
        // (1 path * 2 addrs + 1 account * 3 addrs) * 2 passphrases
        assert_eq!(config.addresses_per_candidate(), 10);
        assert_eq!(config.total_addresses(), 60);
    }

    #[test]
    fn test_fixed_phrase_overrides_slots() {
        let mut config = base_config();
        config.fixed_phrase = Some("abandon able".to_string());
        assert_eq!(config.total_combinations(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip_with_defaults() {
        let json = r#"{
            "word_slots": [
                { "position": 0, "words": ["void", "volcano"] },
                { "position": 1, "words": ["come"] }
            ],
            "phrase_length": 2,
            "account_scheme": {
                "coin": "ethereum",
                "accounts": 1,
                "addresses_per_account": 1
            },
            "targets": ["0x0000000000000000000000000000000000000000"]
        }"#;

        let config = SearchConfig::from_json(json).unwrap();
        assert_eq!(config.passphrases, vec![String::new()]);
        assert_eq!(config.workers, num_cpus::get());
        assert_eq!(config.output.file_name, "results.log");
        assert_eq!(config.total_combinations(), 2);
    }
}
