//! Errors of the pipeline stages

use ethers::types::U256;
use gasless_contracts::EntryPointError;
use gasless_primitives::{
    constants::rpc_error_codes, PackError, UnsupportedEntryPointVersion, UserOperationHash,
    WalletError,
};
use std::time::Duration;
use strum::Display;
use thiserror::Error;

/// Errors while building the unsigned user operation
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Pack(#[from] PackError),

    #[error("failed to query the nonce: {0}")]
    Nonce(EntryPointError),
}

/// Errors while hashing the user operation
#[derive(Debug, Error)]
pub enum HashError {
    /// The entry point could not be reached
    #[error("failed to query the user operation hash: {0}")]
    Provider(EntryPointError),

    /// The entry point answered with an error
    #[error("entry point failed to hash the user operation: {0}")]
    EntryPoint(EntryPointError),

    /// Local and remote hashes disagree
    #[error("local user operation hash {local} differs from the entry point hash {remote}")]
    Mismatch { local: UserOperationHash, remote: UserOperationHash },

    #[error(transparent)]
    UnsupportedVersion(#[from] UnsupportedEntryPointVersion),
}

impl HashError {
    pub fn from_entry_point(err: EntryPointError) -> Self {
        if err.is_provider() {
            Self::Provider(err)
        } else {
            Self::EntryPoint(err)
        }
    }
}

/// Errors while submitting the signed user operation
#[derive(Debug, Error)]
pub enum SubmitError {
    /// JSON-RPC error envelope, `message` verbatim
    #[error("{message} (code {code})")]
    Rpc { code: i64, message: String, data: Option<serde_json::Value> },

    /// HTTP or connection failure
    #[error("transport error: {inner}")]
    Transport { inner: String },

    #[error("stale nonce: user operation has nonce {expected}, sender is at {current}")]
    NonceMismatch { expected: U256, current: U256 },

    #[error(
        "user operation is bound to entry point {entry_point:?} on chain {chain_id}, \
         submitter targets {expected_entry_point:?} on chain {expected_chain_id}"
    )]
    BindingMismatch {
        entry_point: ethers::types::Address,
        chain_id: u64,
        expected_entry_point: ethers::types::Address,
        expected_chain_id: u64,
    },

    /// The packed fields no longer hash to the signed hash
    #[error("user operation was signed as {signed}, its fields hash to {derived}")]
    StaleSignature { signed: UserOperationHash, derived: UserOperationHash },

    #[error(transparent)]
    EntryPoint(#[from] EntryPointError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error("no bundler endpoint configured")]
    MissingBundler,

    #[error("no relayer wallet configured")]
    MissingRelayer,
}

/// Whether a bundler JSON-RPC error code is a validation rejection
pub fn is_validation_code(code: i64) -> bool {
    (rpc_error_codes::SIGNATURE..=rpc_error_codes::VALIDATION).contains(&code) ||
        code == rpc_error_codes::INVALID_PARAMS
}

impl SubmitError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rpc { code, .. } => !is_validation_code(*code),
            Self::Transport { .. } => true,
            Self::EntryPoint(err) => err.is_provider(),
            _ => false,
        }
    }

    /// The bundler refused the user operation on policy or validation grounds
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rpc { code, .. }
            if (rpc_error_codes::SIGNATURE..=rpc_error_codes::VALIDATION).contains(code))
    }
}

/// Errors while waiting for the outcome
#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("no receipt for {handle} after {elapsed:?}")]
    Timeout { handle: String, elapsed: Duration },

    #[error("failed to query the receipt: {inner}")]
    Provider { inner: String },

    #[error("no bundler endpoint configured")]
    MissingBundler,
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Build,
    Hash,
    Sign,
    Submit,
    Confirm,
}

/// Error of a pipeline run, tagged with the failed stage
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("hash failed: {0}")]
    Hash(#[from] HashError),

    #[error("sign failed: {0}")]
    Sign(#[from] WalletError),

    #[error("submit failed: {0}")]
    Submit(#[from] SubmitError),

    #[error("confirm failed: {0}")]
    Confirm(#[from] ConfirmError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Build(_) => Stage::Build,
            Self::Hash(_) => Stage::Hash,
            Self::Sign(_) => Stage::Sign,
            Self::Submit(_) => Stage::Submit,
            Self::Confirm(_) => Stage::Confirm,
        }
    }

    /// Whether running the pipeline again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Build(BuildError::Nonce(err)) => err.is_provider(),
            Self::Hash(HashError::Provider(_)) => true,
            Self::Submit(err) => err.is_retryable(),
            Self::Confirm(ConfirmError::Provider { .. } | ConfirmError::Timeout { .. }) => true,
            _ => false,
        }
    }
}
