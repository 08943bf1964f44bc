//! Cryptographic operations: BIP39 checksum and seed, BIP32/BIP44 derivation,
//! address encoding

use crate::error::{DerivationError, Result};
use bip39::{Language, Mnemonic};
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use bitcoin::Network;
use hmac::Hmac;
use pbkdf2::pbkdf2;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use sha3::{Digest, Keccak256};
use std::str::FromStr;

/// PBKDF2 iteration count for BIP39 seed derivation
const BIP39_PBKDF2_ROUNDS: u32 = 2048;

/// BIP39 salt prefix
const BIP39_SALT_PREFIX: &str = "mnemonic";

/// Result of BIP39 seed derivation
#[derive(Debug, Clone)]
pub struct Bip39Seed {
    /// The 64-byte seed
    pub seed: [u8; 64],
}

/// How a derived key is encoded into an address string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressEncoding {
    /// Keccak-256 of the uncompressed public key, lowercase hex with 0x prefix
    Ethereum,
    /// Base58check of HASH160 of the compressed public key
    BitcoinP2pkh,
}

/// Coin selection for the standardized account scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinType {
    Bitcoin,
    Ethereum,
}

impl CoinType {
    /// BIP44 coin type constant
    pub fn coin_type(&self) -> u32 {
        match self {
            CoinType::Bitcoin => 0,
            CoinType::Ethereum => 60,
        }
    }

    /// Native address encoding for this coin
    pub fn encoding(&self) -> AddressEncoding {
        match self {
            CoinType::Bitcoin => AddressEncoding::BitcoinP2pkh,
            CoinType::Ethereum => AddressEncoding::Ethereum,
        }
    }
}

/// BIP44 change designation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    #[default]
    External,
    Internal,
}

impl Change {
    /// Path component value
    pub fn index(&self) -> u32 {
        match self {
            Change::External => 0,
            Change::Internal => 1,
        }
    }
}

/// The derivation seam between the pipeline and the cryptographic backend
///
/// All operations are pure and deterministic. Checksum rejection is reported
/// through the `bool` return, never as an error; an `Err` from any of the
/// derive operations indicates a malformed configuration and is fatal.
pub trait Derivation: Send + Sync {
    /// Checksum-validate a candidate phrase
    fn is_valid_phrase(&self, phrase: &str) -> bool;

    /// Derive the 64-byte seed from a phrase and passphrase
    fn derive_seed(&self, phrase: &str, passphrase: &str) -> Result<Bip39Seed>;

    /// Derive and encode the address at `path`/`index`
    fn derive_path_address(
        &self,
        seed: &Bip39Seed,
        path: &str,
        index: u32,
        encoding: AddressEncoding,
    ) -> Result<String>;

    /// Derive and encode the address at `m/44'/coin'/account'/change/index`
    fn derive_account_address(
        &self,
        seed: &Bip39Seed,
        coin: CoinType,
        account: u32,
        change: Change,
        index: u32,
    ) -> Result<String>;
}

/// Production derivation backend
#[derive(Debug)]
pub struct CryptoEngine {
    secp: Secp256k1<bitcoin::secp256k1::All>,
}

impl CryptoEngine {
    /// Create a new crypto engine
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// Derive the private key for a full derivation path
    fn derive_key(&self, seed: &Bip39Seed, path: &DerivationPath) -> Result<SecretKey> {
        // The master key network only affects serialization version bytes,
        // never the derived keys.
        let master = Xpriv::new_master(Network::Bitcoin, &seed.seed)
            .map_err(DerivationError::Bip32)?;
        let derived = master
            .derive_priv(&self.secp, path)
            .map_err(DerivationError::Bip32)?;
        Ok(derived.private_key)
    }

    /// Encode a derived key into an address string
    fn encode_address(&self, key: &SecretKey, encoding: AddressEncoding) -> String {
        let public_key = PublicKey::from_secret_key(&self.secp, key);
        match encoding {
            AddressEncoding::Ethereum => {
                let uncompressed = public_key.serialize_uncompressed();
                let mut hasher = Keccak256::new();
                hasher.update(&uncompressed[1..]);
                let hash = hasher.finalize();
                format!("0x{}", hex::encode(&hash[12..]))
            }
            AddressEncoding::BitcoinP2pkh => {
                let public_key = bitcoin::PublicKey::new(public_key);
                bitcoin::Address::p2pkh(&public_key, Network::Bitcoin).to_string()
            }
        }
    }
}

impl Default for CryptoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Derivation for CryptoEngine {
    fn is_valid_phrase(&self, phrase: &str) -> bool {
        Mnemonic::parse_in(Language::English, phrase).is_ok()
    }

    fn derive_seed(&self, phrase: &str, passphrase: &str) -> Result<Bip39Seed> {
        let salt = format!("{}{}", BIP39_SALT_PREFIX, passphrase);

        let mut seed = [0u8; 64];
        pbkdf2::<Hmac<Sha512>>(
            phrase.as_bytes(),
            salt.as_bytes(),
            BIP39_PBKDF2_ROUNDS,
            &mut seed,
        )
        .map_err(|_| DerivationError::Pbkdf2("PBKDF2 operation failed".to_string()))?;

        Ok(Bip39Seed { seed })
    }

    fn derive_path_address(
        &self,
        seed: &Bip39Seed,
        path: &str,
        index: u32,
        encoding: AddressEncoding,
    ) -> Result<String> {
        let base = DerivationPath::from_str(path).map_err(DerivationError::Bip32)?;
        let child = ChildNumber::from_normal_idx(index).map_err(DerivationError::Bip32)?;
        let key = self.derive_key(seed, &base.child(child))?;
        Ok(self.encode_address(&key, encoding))
    }

    fn derive_account_address(
        &self,
        seed: &Bip39Seed,
        coin: CoinType,
        account: u32,
        change: Change,
        index: u32,
    ) -> Result<String> {
        let path = format!(
            "m/44'/{}'/{}'/{}/{}",
            coin.coin_type(),
            account,
            change.index(),
            index
        );
        let path = DerivationPath::from_str(&path).map_err(DerivationError::Bip32)?;
        let key = self.derive_key(seed, &path)?;
        Ok(self.encode_address(&key, coin.encoding()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_validation() {
        let engine = CryptoEngine::new();

        assert!(engine.is_valid_phrase(
            "abandon abandon abandon abandon abandon abandon \
             abandon abandon abandon abandon abandon about"
        ));
        // Same words, broken checksum
        assert!(!engine.is_valid_phrase(
            "abandon abandon abandon abandon abandon abandon \
             abandon abandon abandon abandon abandon abandon"
        ));
        assert!(!engine.is_valid_phrase("not a mnemonic at all"));
    }

    #[test]
    fn test_account_scheme_matches_equivalent_path() {
        let engine = CryptoEngine::new();
        let seed = engine
            .derive_seed(
                "abandon abandon abandon abandon abandon abandon \
                 abandon abandon abandon abandon abandon about",
                "",
            )
            .unwrap();

        let via_account = engine
            .derive_account_address(&seed, CoinType::Ethereum, 0, Change::External, 0)
            .unwrap();
        let via_path = engine
            .derive_path_address(&seed, "m/44'/60'/0'/0", 0, AddressEncoding::Ethereum)
            .unwrap();

        assert_eq!(via_account, via_path);
    }

    #[test]
    fn test_ethereum_addresses_are_lowercase_hex() {
        let engine = CryptoEngine::new();
        let seed = engine.derive_seed("ignored words here", "").unwrap();
        let addr = engine
            .derive_path_address(&seed, "m/44'/60'/0'/0", 0, AddressEncoding::Ethereum)
            .unwrap();

        assert!(addr.starts_with("0x"));
        assert_eq!(addr.len(), 42);
        assert!(addr[2..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(addr, addr.to_lowercase());
    }

    #[test]
    fn test_change_designation_alters_address() {
        let engine = CryptoEngine::new();
        let seed = engine.derive_seed("ignored words here", "").unwrap();

        let external = engine
            .derive_account_address(&seed, CoinType::Bitcoin, 0, Change::External, 0)
            .unwrap();
        let internal = engine
            .derive_account_address(&seed, CoinType::Bitcoin, 0, Change::Internal, 0)
            .unwrap();

        assert_ne!(external, internal);
        assert!(external.starts_with('1'));
    }
}
