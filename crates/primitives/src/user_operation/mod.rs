//! Packed user operation of the v0.7 entry point (ERC-4337)

mod hash;
mod request;

use crate::utils::{
    as_checksum_addr, as_checksum_addr_opt, pack_uint128, unpack_uint128, PackError,
    PaymasterAndData,
};
use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U256};
pub use hash::{EntryPointVersion, UnsupportedEntryPointVersion, UserOperationHash};
pub use request::UserOperationRequest;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Signed user operation bound to the entry point and chain its hash was computed for
///
/// The record is read-only once built: changing any field would invalidate the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Hash of the user operation
    hash: UserOperationHash,

    /// Entry point the hash (and so the signature) is bound to
    #[serde(serialize_with = "as_checksum_addr")]
    entry_point: Address,

    /// Chain the hash (and so the signature) is bound to
    chain_id: u64,

    /// Raw user operation
    user_operation: PackedUserOperation,
}

impl UserOperation {
    pub fn from_packed(
        hash: UserOperationHash,
        entry_point: Address,
        chain_id: u64,
        user_operation: PackedUserOperation,
    ) -> Self {
        Self { hash, entry_point, chain_id, user_operation }
    }

    pub fn hash(&self) -> UserOperationHash {
        self.hash
    }

    pub fn entry_point(&self) -> Address {
        self.entry_point
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn user_operation(&self) -> &PackedUserOperation {
        &self.user_operation
    }

    /// Whether the user operation may be submitted to this entry point on this chain
    pub fn is_bound_to(&self, entry_point: &Address, chain_id: u64) -> bool {
        self.entry_point == *entry_point && self.chain_id == chain_id
    }

    /// Whether the stored hash is still the hash of the packed fields
    pub fn is_consistent(&self) -> bool {
        self.user_operation.hash(&self.entry_point, self.chain_id) == self.hash
    }
}

impl Deref for UserOperation {
    type Target = PackedUserOperation;

    fn deref(&self) -> &Self::Target {
        &self.user_operation
    }
}

impl AsRef<PackedUserOperation> for UserOperation {
    fn as_ref(&self) -> &PackedUserOperation {
        &self.user_operation
    }
}

impl From<UserOperation> for PackedUserOperation {
    fn from(value: UserOperation) -> Self {
        value.user_operation
    }
}

/// User operation as the v0.7 entry point consumes it
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackedUserOperation {
    /// Sender of the user operation
    #[serde(serialize_with = "as_checksum_addr")]
    pub sender: Address,

    /// Nonce (anti replay protection), upper 192 bits are the nonce key
    pub nonce: U256,

    /// Init code for the account (needed if account not yet deployed and needs to be created)
    pub init_code: Bytes,

    /// The data that is passed to the sender during the main execution call
    pub call_data: Bytes,

    /// Verification gas limit (upper 128 bits) and call gas limit (lower 128 bits)
    pub account_gas_limits: H256,

    /// The amount of gas to pay bundler to compensate for the pre-verification execution and
    /// calldata
    pub pre_verification_gas: U256,

    /// Max priority fee per gas (upper 128 bits) and max fee per gas (lower 128 bits)
    pub gas_fees: H256,

    /// Paymaster address, its verification and post-op gas limits and extra data to send to the
    /// paymaster (empty when not sponsored)
    pub paymaster_and_data: Bytes,

    /// Data passed to the account along with the nonce during the verification step
    pub signature: Bytes,
}

impl PackedUserOperation {
    pub fn verification_gas_limit(&self) -> U256 {
        unpack_uint128(&self.account_gas_limits).0
    }

    pub fn call_gas_limit(&self) -> U256 {
        unpack_uint128(&self.account_gas_limits).1
    }

    pub fn max_priority_fee_per_gas(&self) -> U256 {
        unpack_uint128(&self.gas_fees).0
    }

    pub fn max_fee_per_gas(&self) -> U256 {
        unpack_uint128(&self.gas_fees).1
    }

    /// Unpacks `paymasterAndData`
    pub fn paymaster(&self) -> Result<Option<PaymasterAndData>, PackError> {
        PaymasterAndData::unpack(&self.paymaster_and_data)
    }

    // Builder pattern helpers

    /// Sets the sender of the user operation
    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self
    }

    /// Sets the nonce of the user operation
    pub fn nonce(mut self, nonce: U256) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the init code of the user operation
    pub fn init_code(mut self, init_code: Bytes) -> Self {
        self.init_code = init_code;
        self
    }

    /// Sets the call data of the user operation
    pub fn call_data(mut self, call_data: Bytes) -> Self {
        self.call_data = call_data;
        self
    }

    /// Packs and sets the verification and call gas limits
    pub fn gas_limits(
        mut self,
        verification_gas_limit: U256,
        call_gas_limit: U256,
    ) -> Result<Self, PackError> {
        self.account_gas_limits = pack_uint128(verification_gas_limit, call_gas_limit)?;
        Ok(self)
    }

    /// Sets the pre-verification gas of the user operation
    pub fn pre_verification_gas(mut self, pre_verification_gas: U256) -> Self {
        self.pre_verification_gas = pre_verification_gas;
        self
    }

    /// Packs and sets the fee pair
    pub fn fees(
        mut self,
        max_priority_fee_per_gas: U256,
        max_fee_per_gas: U256,
    ) -> Result<Self, PackError> {
        self.gas_fees = pack_uint128(max_priority_fee_per_gas, max_fee_per_gas)?;
        Ok(self)
    }

    /// Sets the paymaster and data of the user operation
    pub fn paymaster_and_data(mut self, paymaster_and_data: Bytes) -> Self {
        self.paymaster_and_data = paymaster_and_data;
        self
    }

    /// Sets the signature of the user operation
    pub fn signature(mut self, signature: Bytes) -> Self {
        self.signature = signature;
        self
    }
}

/// Receipt of the user operation (returned from the RPC endpoint eth_getUserOperationReceipt)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    #[serde(rename = "userOpHash")]
    pub user_operation_hash: UserOperationHash,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_checksum_addr_opt"
    )]
    pub entry_point: Option<Address>,
    #[serde(serialize_with = "as_checksum_addr")]
    pub sender: Address,
    pub nonce: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    pub actual_gas_cost: U256,
    pub actual_gas_used: U256,
    pub success: bool,
    #[serde(default)]
    pub reason: String,
    pub logs: Vec<Log>,
    #[serde(rename = "receipt")]
    pub tx_receipt: TransactionReceipt,
}

/// Gas estimations for user operation (returned from the RPC endpoint eth_estimateUserOperationGas)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationGasEstimation {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
}
