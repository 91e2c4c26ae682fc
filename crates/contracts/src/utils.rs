use crate::gen::{entry_point_api, SELECTORS_NAMES};
use ethers::types::H256;
use gasless_primitives::PackedUserOperation;

impl From<PackedUserOperation> for entry_point_api::PackedUserOperation {
    fn from(uo: PackedUserOperation) -> Self {
        Self {
            sender: uo.sender,
            nonce: uo.nonce,
            init_code: uo.init_code,
            call_data: uo.call_data,
            account_gas_limits: uo.account_gas_limits.0,
            pre_verification_gas: uo.pre_verification_gas,
            gas_fees: uo.gas_fees.0,
            paymaster_and_data: uo.paymaster_and_data,
            signature: uo.signature,
        }
    }
}

impl From<entry_point_api::PackedUserOperation> for PackedUserOperation {
    fn from(uo: entry_point_api::PackedUserOperation) -> Self {
        Self {
            sender: uo.sender,
            nonce: uo.nonce,
            init_code: uo.init_code,
            call_data: uo.call_data,
            account_gas_limits: H256(uo.account_gas_limits),
            pre_verification_gas: uo.pre_verification_gas,
            gas_fees: H256(uo.gas_fees),
            paymaster_and_data: uo.paymaster_and_data,
            signature: uo.signature,
        }
    }
}

impl From<gasless_primitives::UserOperation> for entry_point_api::PackedUserOperation {
    fn from(uo: gasless_primitives::UserOperation) -> Self {
        PackedUserOperation::from(uo).into()
    }
}

/// Name of the function called by the call data, if it is a known one
pub fn function_name(data: &[u8]) -> Option<&'static str> {
    let selector: [u8; 4] = data.get(0..4)?.try_into().ok()?;
    SELECTORS_NAMES.get(&selector).map(String::as_str)
}
