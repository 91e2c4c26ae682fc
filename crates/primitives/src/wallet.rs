//! A `Wallet` is a wrapper around an ethers wallet that signs user operation hashes
use crate::{PackedUserOperation, UserOperation, UserOperationHash};
use ethers::{
    prelude::k256::ecdsa::SigningKey,
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer},
    types::{Address, H256},
};
use expanded_pathbuf::ExpandedPathBuf;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

const DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// How the user operation hash is turned into the signed digest
///
/// The account validates an ECDSA signature over the raw 32-byte hash, so only the raw scheme
/// exists. Prefixed (EIP-191 "personal") signatures would recover to a different address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningScheme {
    #[default]
    Raw,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("signing scheme {0} is not supported, the account expects raw hash signatures")]
pub struct UnsupportedSigningScheme(pub String);

impl FromStr for SigningScheme {
    type Err = UnsupportedSigningScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            other => Err(UnsupportedSigningScheme(other.to_string())),
        }
    }
}

impl fmt::Display for SigningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("failed to load signing key: {inner}")]
    Key { inner: String },
    #[error("failed to sign user operation: {inner}")]
    Signing { inner: String },
    #[error(transparent)]
    UnsupportedScheme(#[from] UnsupportedSigningScheme),
}

/// Wrapper around ethers wallet
#[derive(Clone, Debug)]
pub struct Wallet {
    /// Signing key of the wallet
    pub signer: ethers::signers::Wallet<SigningKey>,
    /// Digest the signature is produced over
    pub scheme: SigningScheme,
}

impl Wallet {
    /// Create a new wallet from the given file containing the mnemonic phrase
    ///
    /// # Arguments
    /// * `path` - The path to the file where the mnemonic phrase is stored
    /// * `chain_id` - The chain id of the blockchain network to be used
    pub fn from_file(path: ExpandedPathBuf, chain_id: u64) -> Result<Self, WalletError> {
        let wallet = MnemonicBuilder::<English>::default()
            .phrase(path.to_path_buf())
            .derivation_path(DERIVATION_PATH)
            .and_then(|builder| builder.build())
            .map_err(|err| WalletError::Key { inner: err.to_string() })?;

        Ok(Self::from_signer(wallet, chain_id))
    }

    /// Create a new wallet from the given mnemonic phrase
    pub fn from_phrase(phrase: &str, chain_id: u64) -> Result<Self, WalletError> {
        let wallet = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .derivation_path(DERIVATION_PATH)
            .and_then(|builder| builder.build())
            .map_err(|err| WalletError::Key { inner: err.to_string() })?;

        Ok(Self::from_signer(wallet, chain_id))
    }

    /// Create a new wallet from a hex encoded private key
    pub fn from_private_key(key: &str, chain_id: u64) -> Result<Self, WalletError> {
        let wallet = key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|err| WalletError::Key { inner: err.to_string() })?;

        Ok(Self::from_signer(wallet, chain_id))
    }

    fn from_signer(signer: LocalWallet, chain_id: u64) -> Self {
        Self { signer: signer.with_chain_id(chain_id), scheme: SigningScheme::Raw }
    }

    pub fn with_scheme(mut self, scheme: SigningScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Signs the user operation hash and binds the signed user operation to the entry point and
    /// chain the hash was computed for
    ///
    /// The signature is 65 bytes (`r || s || v`) over the raw hash, no message prefix.
    pub fn sign_user_operation(
        &self,
        uo: PackedUserOperation,
        hash: UserOperationHash,
        entry_point: Address,
        chain_id: u64,
    ) -> Result<UserOperation, WalletError> {
        let digest: H256 = match self.scheme {
            SigningScheme::Raw => hash.into(),
        };
        let sig = self
            .signer
            .sign_hash(digest)
            .map_err(|err| WalletError::Signing { inner: err.to_string() })?;

        Ok(UserOperation::from_packed(
            hash,
            entry_point,
            chain_id,
            uo.signature(sig.to_vec().into()),
        ))
    }
}
