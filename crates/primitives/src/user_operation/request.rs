//! User operation request (unpacked v0.7 JSON form)

use super::PackedUserOperation;
use crate::utils::{
    as_checksum_addr, as_checksum_addr_opt, pack_init_code, pack_paymaster_data, pack_uint128,
    unpack_init_code, unpack_uint128, PackError, PaymasterAndData,
};
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// User operation as bundlers accept it over JSON-RPC (`eth_sendUserOperation`)
///
/// Factory and paymaster fields are omitted when the operation has none.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationRequest {
    #[serde(serialize_with = "as_checksum_addr")]
    pub sender: Address,
    pub nonce: U256,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_checksum_addr_opt"
    )]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_checksum_addr_opt"
    )]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    #[serde(default)]
    pub signature: Bytes,
}

impl TryFrom<&PackedUserOperation> for UserOperationRequest {
    type Error = PackError;

    fn try_from(uo: &PackedUserOperation) -> Result<Self, Self::Error> {
        let (verification_gas_limit, call_gas_limit) = unpack_uint128(&uo.account_gas_limits);
        let (max_priority_fee_per_gas, max_fee_per_gas) = unpack_uint128(&uo.gas_fees);
        let (factory, factory_data) = match unpack_init_code(&uo.init_code)? {
            Some((factory, data)) => (Some(factory), Some(data)),
            None => (None, None),
        };
        let paymaster = PaymasterAndData::unpack(&uo.paymaster_and_data)?;

        Ok(Self {
            sender: uo.sender,
            nonce: uo.nonce,
            factory,
            factory_data,
            call_data: uo.call_data.clone(),
            call_gas_limit,
            verification_gas_limit,
            pre_verification_gas: uo.pre_verification_gas,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            paymaster: paymaster.as_ref().map(|p| p.paymaster),
            paymaster_verification_gas_limit: paymaster.as_ref().map(|p| p.verification_gas_limit),
            paymaster_post_op_gas_limit: paymaster.as_ref().map(|p| p.post_op_gas_limit),
            paymaster_data: paymaster.map(|p| p.data),
            signature: uo.signature.clone(),
        })
    }
}

impl TryFrom<UserOperationRequest> for PackedUserOperation {
    type Error = PackError;

    fn try_from(req: UserOperationRequest) -> Result<Self, Self::Error> {
        let paymaster = req.paymaster.map(|paymaster| PaymasterAndData {
            paymaster,
            verification_gas_limit: req.paymaster_verification_gas_limit.unwrap_or_default(),
            post_op_gas_limit: req.paymaster_post_op_gas_limit.unwrap_or_default(),
            data: req.paymaster_data.clone().unwrap_or_default(),
        });

        Ok(Self {
            sender: req.sender,
            nonce: req.nonce,
            init_code: pack_init_code(req.factory, &req.factory_data.unwrap_or_default()),
            call_data: req.call_data,
            account_gas_limits: pack_uint128(req.verification_gas_limit, req.call_gas_limit)?,
            pre_verification_gas: req.pre_verification_gas,
            gas_fees: pack_uint128(req.max_priority_fee_per_gas, req.max_fee_per_gas)?,
            paymaster_and_data: pack_paymaster_data(paymaster.as_ref())?,
            signature: req.signature,
        })
    }
}
