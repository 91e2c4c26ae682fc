//! Sponsored account abstraction (ERC-4337) primitive types
//!
//! This crate contains the packed user operation record of the v0.7 entry point, the helpers
//! that pack and unpack its gas and paymaster fields, and the wallet used to sign it.

pub mod constants;
pub mod provider;
mod user_operation;
mod utils;
mod wallet;

pub use user_operation::{
    EntryPointVersion, PackedUserOperation, UnsupportedEntryPointVersion, UserOperation,
    UserOperationGasEstimation, UserOperationHash, UserOperationReceipt, UserOperationRequest,
};
pub use utils::{
    as_checksum_addr, as_checksum_addr_opt, dummy_signature, pack_init_code, pack_paymaster_data,
    pack_uint128, unpack_init_code, unpack_uint128, PackError, PaymasterAndData,
};
pub use wallet::{SigningScheme, UnsupportedSigningScheme, Wallet, WalletError};
