//! Account abstraction (ERC-4337)-related constants

/// Entry point smart contract
pub mod entry_point {
    /// Address of the entry point smart contract
    pub const ADDRESS: &str = "0x0000000071727De22E5E9d8BAf0edAc6f37da032";
    /// Version of the entry point smart contract
    pub const VERSION: &str = "0.7.0";
    /// Nonce key used when none is configured
    pub const NONCE_KEY: u64 = 0;

    /// Offset of the paymaster verification gas limit inside `paymasterAndData`
    pub const PAYMASTER_VALIDATION_GAS_OFFSET: usize = 20;
    /// Offset of the paymaster post-op gas limit inside `paymasterAndData`
    pub const PAYMASTER_POSTOP_GAS_OFFSET: usize = 36;
    /// Offset of the opaque paymaster payload inside `paymasterAndData`
    pub const PAYMASTER_DATA_OFFSET: usize = 52;
}

/// Gas defaults for sponsored user operations
pub mod gas {
    pub const CALL_GAS_LIMIT: u64 = 200_000;
    pub const VERIFICATION_GAS_LIMIT: u64 = 150_000;
    pub const PRE_VERIFICATION_GAS: u64 = 60_000;
    pub const PAYMASTER_VERIFICATION_GAS_LIMIT: u64 = 100_000;
    pub const PAYMASTER_POST_OP_GAS_LIMIT: u64 = 50_000;

    /// 1.5 gwei
    pub const PRIORITY_FEE_PER_GAS: u64 = 1_500_000_000;
    /// Base fee used when the chain reports none (or the read fails), 1 gwei
    pub const BASE_FEE_FLOOR: u64 = 1_000_000_000;
    /// `maxFeePerGas = base fee * multiplier / 100 + priority fee`
    pub const BASE_FEE_MULTIPLIER_PERCENT: u64 = 200;
}

/// Bundler JSON-RPC error codes
/// https://eips.ethereum.org/EIPS/eip-4337#rpc-methods-eth-namespace
pub mod rpc_error_codes {
    pub const VALIDATION: i64 = -32500;
    pub const PAYMASTER: i64 = -32501;
    pub const OPCODE: i64 = -32502;
    pub const EXPIRATION: i64 = -32503;
    pub const ENTITY_BANNED_OR_THROTTLED: i64 = -32504;
    pub const STAKE_TOO_LOW: i64 = -32505;
    pub const SIGNATURE_AGGREGATOR: i64 = -32506;
    pub const SIGNATURE: i64 = -32507;
    pub const INVALID_PARAMS: i64 = -32602;
}

/// Receipt polling and request timeouts
pub mod polling {
    pub const MAX_ATTEMPTS: u64 = 30;
    pub const MIN_WAIT_MILLIS: u64 = 500;
    pub const MAX_WAIT_MILLIS: u64 = 5_000;
    pub const DEADLINE_SECS: u64 = 120;
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Placeholder signature used for gas estimation (65 bytes, recoverable by nobody)
pub const DUMMY_SIGNATURE: &str = "0xfffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c";
