//! Per-candidate checking: checksum filter, derivation across both schemes,
//! target comparison

use crate::config::{AccountSchemeConfig, PathSchemeConfig, SearchConfig};
use crate::crypto::{Bip39Seed, Derivation};
use crate::error::Result;
use crate::generator::Candidate;
use crate::logsink::LogHandle;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

/// Evidence for a found match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvidence {
    /// The candidate phrase
    pub phrase: String,
    /// The passphrase it was combined with
    pub passphrase: String,
    /// The derived address that matched the target set
    pub address: String,
}

/// Checks one candidate at a time against the target set
///
/// Scan order is significant only for which address is reported when a single
/// candidate would match more than once: passphrases in configured order, the
/// path scheme before the account scheme, ascending indices throughout, and
/// the first hit short-circuits everything that remains.
pub struct AddressChecker<D> {
    derivation: Arc<D>,
    passphrases: Vec<String>,
    path_scheme: Option<PathSchemeConfig>,
    account_scheme: Option<AccountSchemeConfig>,
    targets: HashSet<String>,
    log: LogHandle,
}

impl<D: Derivation> AddressChecker<D> {
    /// Create a checker from the validated configuration
    pub fn new(derivation: Arc<D>, config: &SearchConfig, log: LogHandle) -> Self {
        Self {
            derivation,
            passphrases: config.passphrases.clone(),
            path_scheme: config.path_scheme.clone(),
            account_scheme: config.account_scheme.clone(),
            targets: config.target_set(),
            log,
        }
    }

    /// Check a candidate, returning evidence on the first target hit
    ///
    /// Candidates failing the checksum are dropped before any derivation work
    /// and produce no output at all.
    pub fn check(&self, candidate: &Candidate) -> Result<Option<MatchEvidence>> {
        if !self.derivation.is_valid_phrase(&candidate.phrase) {
            return Ok(None);
        }

        for passphrase in &self.passphrases {
            let seed = self.derivation.derive_seed(&candidate.phrase, passphrase)?;

            if let Some(evidence) = self.check_path_scheme(candidate, passphrase, &seed)? {
                return Ok(Some(evidence));
            }
            if let Some(evidence) = self.check_account_scheme(candidate, passphrase, &seed)? {
                return Ok(Some(evidence));
            }
        }

        Ok(None)
    }

    /// Derive addresses under every configured path
    fn check_path_scheme(
        &self,
        candidate: &Candidate,
        passphrase: &str,
        seed: &Bip39Seed,
    ) -> Result<Option<MatchEvidence>> {
        let Some(scheme) = &self.path_scheme else {
            return Ok(None);
        };

        let mut trace = format!(
            "mnemonic: {}, passphrase: {}",
            candidate.phrase, passphrase
        );

        for path in &scheme.paths {
            let _ = write!(trace, "\n  path {}", path);

            for index in 0..scheme.addresses_per_path {
                let address =
                    self.derivation
                        .derive_path_address(seed, path, index, scheme.encoding)?;
                let _ = write!(trace, "\n    address {}: {}", index, address);

                if self.targets.contains(&address) {
                    return Ok(Some(self.report(candidate, passphrase, address)));
                }
            }
        }

        self.log.log_verbose(trace);
        Ok(None)
    }

    /// Derive addresses under every account of the standardized scheme
    fn check_account_scheme(
        &self,
        candidate: &Candidate,
        passphrase: &str,
        seed: &Bip39Seed,
    ) -> Result<Option<MatchEvidence>> {
        let Some(scheme) = &self.account_scheme else {
            return Ok(None);
        };

        let mut trace = format!(
            "mnemonic: {}, passphrase: {}",
            candidate.phrase, passphrase
        );

        for account in 0..scheme.accounts {
            let _ = write!(trace, "\n  account {}", account);

            for index in 0..scheme.addresses_per_account {
                let address = self.derivation.derive_account_address(
                    seed,
                    scheme.coin,
                    account,
                    scheme.change,
                    index,
                )?;
                let _ = write!(trace, "\n    address {}: {}", index, address);

                if self.targets.contains(&address) {
                    return Ok(Some(self.report(candidate, passphrase, address)));
                }
            }
        }

        self.log.log_verbose(trace);
        Ok(None)
    }

    /// Record the found match and assemble its evidence
    fn report(&self, candidate: &Candidate, passphrase: &str, address: String) -> MatchEvidence {
        self.log.log(format!(
            "found: {}, mnemonic: {}, passphrase: {}",
            address, candidate.phrase, passphrase
        ));
        MatchEvidence {
            phrase: candidate.phrase.clone(),
            passphrase: passphrase.to_string(),
            address,
        }
    }
}
