use super::PackedUserOperation;
use ethers::{
    abi::AbiEncode,
    contract::{EthAbiCodec, EthAbiType},
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Deref, str::FromStr};
use thiserror::Error;

/// User operation hash
#[derive(
    Eq, Hash, PartialEq, Debug, Serialize, Deserialize, Clone, Copy, Default, PartialOrd, Ord,
)]
pub struct UserOperationHash(pub H256);

impl From<H256> for UserOperationHash {
    fn from(value: H256) -> Self {
        Self(value)
    }
}

impl From<UserOperationHash> for H256 {
    fn from(value: UserOperationHash) -> Self {
        value.0
    }
}

impl From<[u8; 32]> for UserOperationHash {
    fn from(value: [u8; 32]) -> Self {
        Self(H256(value))
    }
}

impl FromStr for UserOperationHash {
    type Err = <H256 as FromStr>::Err;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        H256::from_str(s).map(|h| h.into())
    }
}

impl fmt::Display for UserOperationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl UserOperationHash {
    #[inline]
    pub const fn as_fixed_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }

    #[inline]
    pub const fn zero() -> UserOperationHash {
        UserOperationHash(H256([0u8; 32]))
    }

    pub fn from_slice(src: &[u8]) -> Self {
        Self(H256::from_slice(src))
    }
}

/// Entry point versions whose hash encoding can be replicated off-chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryPointVersion {
    #[default]
    #[serde(rename = "0.7.0")]
    V0_7,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("entry point version {0} has no local hash encoding")]
pub struct UnsupportedEntryPointVersion(pub String);

impl FromStr for EntryPointVersion {
    type Err = UnsupportedEntryPointVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('v') {
            "0.7" | "0.7.0" => Ok(Self::V0_7),
            other => Err(UnsupportedEntryPointVersion(other.to_string())),
        }
    }
}

impl fmt::Display for EntryPointVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V0_7 => f.write_str("0.7.0"),
        }
    }
}

impl EntryPointVersion {
    /// Computes the user operation hash the way this entry point version does
    pub fn hash(
        &self,
        uo: &PackedUserOperation,
        entry_point: &Address,
        chain_id: u64,
    ) -> UserOperationHash {
        match self {
            Self::V0_7 => uo.hash(entry_point, chain_id),
        }
    }
}

/// Packed user operation without signature, dynamic fields replaced by their hashes
#[derive(EthAbiCodec, EthAbiType)]
struct PackedUserOperationNoSignature {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: H256,
    pub call_data: H256,
    pub account_gas_limits: H256,
    pub pre_verification_gas: U256,
    pub gas_fees: H256,
    pub paymaster_and_data: H256,
}

impl From<&PackedUserOperation> for PackedUserOperationNoSignature {
    fn from(value: &PackedUserOperation) -> Self {
        Self {
            sender: value.sender,
            nonce: value.nonce,
            init_code: keccak256(value.init_code.deref()).into(),
            call_data: keccak256(value.call_data.deref()).into(),
            account_gas_limits: value.account_gas_limits,
            pre_verification_gas: value.pre_verification_gas,
            gas_fees: value.gas_fees,
            paymaster_and_data: keccak256(value.paymaster_and_data.deref()).into(),
        }
    }
}

impl PackedUserOperation {
    /// Packs the user operation without signature (entry point v0.7 encoding)
    pub fn pack_without_signature(&self) -> Bytes {
        PackedUserOperationNoSignature::from(self).encode().into()
    }

    /// Calculates the hash of the user operation as entry point v0.7 does
    ///
    /// `keccak256(abi.encode(keccak256(pack(uo)), entryPoint, chainId))`
    pub fn hash(&self, entry_point: &Address, chain_id: u64) -> UserOperationHash {
        H256::from(keccak256(
            [
                keccak256(self.pack_without_signature().deref()).to_vec(),
                entry_point.encode(),
                U256::from(chain_id).encode(),
            ]
            .concat(),
        ))
        .into()
    }
}
