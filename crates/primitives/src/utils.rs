//! Packing helpers for the v0.7 user operation fields

use crate::constants::{
    entry_point::{
        PAYMASTER_DATA_OFFSET, PAYMASTER_POSTOP_GAS_OFFSET, PAYMASTER_VALIDATION_GAS_OFFSET,
    },
    DUMMY_SIGNATURE,
};
use ethers::{
    types::{Address, Bytes, H256, U256},
    utils::to_checksum,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while packing or unpacking user operation fields
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    #[error("operand {value} does not fit into 128 bits")]
    OperandTooWide { value: U256 },
    #[error("paymasterAndData is {len} bytes long, expected empty or at least 52 bytes")]
    MalformedPaymasterAndData { len: usize },
    #[error("initCode is {len} bytes long, expected empty or at least 20 bytes")]
    MalformedInitCode { len: usize },
}

/// Converts address to checksum address
pub fn as_checksum_addr<S>(val: &Address, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_str(&to_checksum(val, None))
}

/// Converts Option address to checksum
pub fn as_checksum_addr_opt<S>(val: &Option<Address>, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if let Some(addr) = val {
        s.serialize_str(&to_checksum(addr, None))
    } else {
        s.serialize_none()
    }
}

fn to_uint128(value: U256) -> Result<u128, PackError> {
    if value.bits() > 128 {
        return Err(PackError::OperandTooWide { value });
    }
    Ok(value.as_u128())
}

/// Packs two uint128 into one 32-byte word, `hi` in the upper half
///
/// Either operand wider than 128 bits is an error; nothing is truncated.
pub fn pack_uint128(hi: U256, lo: U256) -> Result<H256, PackError> {
    let mut word = [0u8; 32];
    word[0..16].copy_from_slice(&to_uint128(hi)?.to_be_bytes());
    word[16..32].copy_from_slice(&to_uint128(lo)?.to_be_bytes());
    Ok(H256(word))
}

/// Unpacks two uint128 from a 32-byte word, upper half first
pub fn unpack_uint128(word: &H256) -> (U256, U256) {
    (U256::from_big_endian(&word.0[0..16]), U256::from_big_endian(&word.0[16..32]))
}

/// Paymaster sponsorship, the unpacked form of `paymasterAndData`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterAndData {
    #[serde(serialize_with = "as_checksum_addr")]
    pub paymaster: Address,
    pub verification_gas_limit: U256,
    pub post_op_gas_limit: U256,
    /// Opaque paymaster payload (e.g. the gas token address)
    pub data: Bytes,
}

impl PaymasterAndData {
    /// `paymaster (20) || verificationGasLimit (16) || postOpGasLimit (16) || data`
    pub fn pack(&self) -> Result<Bytes, PackError> {
        let gas = pack_uint128(self.verification_gas_limit, self.post_op_gas_limit)?;
        Ok([self.paymaster.as_bytes(), gas.as_bytes(), self.data.as_ref()].concat().into())
    }

    /// Unpacks `paymasterAndData`; empty input means no sponsorship
    pub fn unpack(buf: &[u8]) -> Result<Option<Self>, PackError> {
        if buf.is_empty() {
            return Ok(None);
        }
        if buf.len() < PAYMASTER_DATA_OFFSET {
            return Err(PackError::MalformedPaymasterAndData { len: buf.len() });
        }

        Ok(Some(Self {
            paymaster: Address::from_slice(&buf[0..PAYMASTER_VALIDATION_GAS_OFFSET]),
            verification_gas_limit: U256::from_big_endian(
                &buf[PAYMASTER_VALIDATION_GAS_OFFSET..PAYMASTER_POSTOP_GAS_OFFSET],
            ),
            post_op_gas_limit: U256::from_big_endian(
                &buf[PAYMASTER_POSTOP_GAS_OFFSET..PAYMASTER_DATA_OFFSET],
            ),
            data: Bytes::from(buf[PAYMASTER_DATA_OFFSET..].to_vec()),
        }))
    }
}

/// Produces `paymasterAndData`; the empty byte string only for `None`
pub fn pack_paymaster_data(paymaster: Option<&PaymasterAndData>) -> Result<Bytes, PackError> {
    match paymaster {
        Some(paymaster) => paymaster.pack(),
        None => Ok(Bytes::default()),
    }
}

/// `factory (20) || factoryData`, or empty when there is no factory
pub fn pack_init_code(factory: Option<Address>, factory_data: &Bytes) -> Bytes {
    match factory {
        Some(factory) => [factory.as_bytes(), factory_data.as_ref()].concat().into(),
        None => Bytes::default(),
    }
}

pub fn unpack_init_code(init_code: &[u8]) -> Result<Option<(Address, Bytes)>, PackError> {
    match init_code.len() {
        0 => Ok(None),
        len if len < 20 => Err(PackError::MalformedInitCode { len }),
        _ => Ok(Some((
            Address::from_slice(&init_code[0..20]),
            Bytes::from(init_code[20..].to_vec()),
        ))),
    }
}

/// Placeholder signature of the right length for gas estimation
pub fn dummy_signature() -> Bytes {
    DUMMY_SIGNATURE.parse().expect("dummy signature is valid hex")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_signature_is_65_bytes() {
        assert_eq!(dummy_signature().len(), 65);
    }

    #[test]
    fn pack_unpack_u128() {
        let a: U256 = 100.into();
        let b: U256 = 200.into();
        let packed = pack_uint128(a, b).unwrap();
        let (new_a, new_b) = unpack_uint128(&packed);
        assert_eq!(a, new_a, "unpack a worked");
        assert_eq!(b, new_b, "unpack b worked");
    }

    #[test]
    fn pack_u128_layout() {
        let packed = pack_uint128(150_000.into(), 200_000.into()).unwrap();
        assert_eq!(
            format!("{packed:?}"),
            "0x000000000000000000000000000249f000000000000000000000000000030d40"
        );
    }

    #[test]
    fn pack_u128_boundary() {
        let max = U256::from(u128::MAX);
        let packed = pack_uint128(max, max).unwrap();
        assert_eq!(unpack_uint128(&packed), (max, max));

        let too_wide = max + 1;
        assert_eq!(
            pack_uint128(too_wide, U256::zero()),
            Err(PackError::OperandTooWide { value: too_wide })
        );
        assert_eq!(
            pack_uint128(U256::zero(), U256::MAX),
            Err(PackError::OperandTooWide { value: U256::MAX })
        );
    }

    #[test]
    fn paymaster_and_data_unpack() {
        let paymaster = PaymasterAndData {
            paymaster: "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5".parse().unwrap(),
            verification_gas_limit: 100_000.into(),
            post_op_gas_limit: 50_000.into(),
            data: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".parse().unwrap(),
        };
        let packed = pack_paymaster_data(Some(&paymaster)).unwrap();
        assert_eq!(packed.len(), 72);
        assert_eq!(PaymasterAndData::unpack(&packed).unwrap(), Some(paymaster.clone()));

        let bare = PaymasterAndData { data: Bytes::default(), ..paymaster };
        let packed = bare.pack().unwrap();
        assert_eq!(packed.len(), PAYMASTER_DATA_OFFSET);
        assert_eq!(PaymasterAndData::unpack(&packed).unwrap(), Some(bare));
    }

    #[test]
    fn paymaster_and_data_malformed() {
        assert_eq!(PaymasterAndData::unpack(&[]).unwrap(), None);
        assert_eq!(pack_paymaster_data(None).unwrap(), Bytes::default());

        for len in [1, 20, 51] {
            assert_eq!(
                PaymasterAndData::unpack(&vec![1u8; len]),
                Err(PackError::MalformedPaymasterAndData { len })
            );
        }
    }

    #[test]
    fn pack_init_code_unpack() {
        let addr: Address = "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5".parse().unwrap();
        let data: Bytes = "0x12345678".parse().unwrap();
        let packed = pack_init_code(Some(addr), &data);
        assert_eq!(unpack_init_code(&packed).unwrap(), Some((addr, data)));
        assert_eq!(unpack_init_code(&[]).unwrap(), None);
        assert_eq!(unpack_init_code(&[0u8; 4]), Err(PackError::MalformedInitCode { len: 4 }));
    }
}
