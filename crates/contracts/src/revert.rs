//! Revert reasons of user operations and bundles
//!
//! The reason is recovered in three steps: the `UserOperationRevertReason` event emitted for the
//! user operation, the known entry point error selectors, and finally the raw revert data.

use crate::{
    error::decode_revert_string,
    gen::{EntryPointAPIErrors, UserOperationEventFilter, UserOperationRevertReasonFilter},
};
use ethers::{
    abi::AbiDecode,
    contract::{parse_log, EthEvent},
    types::{Bytes, Log, U256},
};
use gasless_primitives::UserOperationHash;
use std::fmt;

/// Decoded revert reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    /// `FailedOp(uint256,string)`
    FailedOp { op_index: U256, reason: String },
    /// `FailedOpWithRevert(uint256,string,bytes)`
    FailedOpWithRevert { op_index: U256, reason: String, inner: Bytes },
    /// `PostOpReverted(bytes)`
    PostOpReverted { return_data: Bytes },
    /// `Error(string)`
    RevertString(String),
    /// Revert data matching no known selector
    Raw(Bytes),
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailedOp { op_index, reason } => {
                write!(f, "user operation {op_index} failed: {reason}")
            }
            Self::FailedOpWithRevert { op_index, reason, inner } => {
                write!(f, "user operation {op_index} failed: {reason} ({inner})")
            }
            Self::PostOpReverted { return_data } => write!(f, "post op reverted: {return_data}"),
            Self::RevertString(reason) => f.write_str(reason),
            Self::Raw(data) => write!(f, "{data}"),
        }
    }
}

impl RevertReason {
    /// The `AAxx` style reason string, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::FailedOp { reason, .. } | Self::FailedOpWithRevert { reason, .. } => {
                Some(reason)
            }
            Self::RevertString(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Decodes revert data against the known entry point errors, keeping the raw bytes otherwise
pub fn decode_revert_reason(data: &Bytes) -> RevertReason {
    match EntryPointAPIErrors::decode(data.as_ref()) {
        Ok(EntryPointAPIErrors::FailedOp(err)) => {
            RevertReason::FailedOp { op_index: err.op_index, reason: err.reason }
        }
        Ok(EntryPointAPIErrors::FailedOpWithRevert(err)) => RevertReason::FailedOpWithRevert {
            op_index: err.op_index,
            reason: err.reason,
            inner: err.inner,
        },
        Ok(EntryPointAPIErrors::PostOpReverted(err)) => {
            RevertReason::PostOpReverted { return_data: err.return_data }
        }
        _ => match decode_revert_string(data.clone()) {
            Some(reason) => RevertReason::RevertString(reason),
            None => RevertReason::Raw(data.clone()),
        },
    }
}

fn matches_hash(topic: &[u8; 32], user_operation_hash: Option<&UserOperationHash>) -> bool {
    user_operation_hash.map_or(true, |hash| hash.as_fixed_bytes() == topic)
}

/// Finds the `UserOperationEvent` of the user operation
pub fn find_user_operation_event(
    logs: &[Log],
    user_operation_hash: Option<&UserOperationHash>,
) -> Option<UserOperationEventFilter> {
    logs.iter()
        .filter(|log| log.topics.first() == Some(&UserOperationEventFilter::signature()))
        .filter_map(|log| parse_log::<UserOperationEventFilter>(log.clone()).ok())
        .find(|event| matches_hash(&event.user_op_hash, user_operation_hash))
}

/// Finds the revert reason the entry point emitted for the user operation
pub fn find_revert_reason(
    logs: &[Log],
    user_operation_hash: Option<&UserOperationHash>,
) -> Option<RevertReason> {
    logs.iter()
        .filter(|log| log.topics.first() == Some(&UserOperationRevertReasonFilter::signature()))
        .filter_map(|log| parse_log::<UserOperationRevertReasonFilter>(log.clone()).ok())
        .find(|event| matches_hash(&event.user_op_hash, user_operation_hash))
        .map(|event| decode_revert_reason(&event.revert_reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::FailedOp;
    use ethers::{
        abi::{encode, Token},
        contract::EthError,
        types::{Address, H256},
    };
    use std::str::FromStr;

    fn revert_reason_log(hash: H256, sender: Address, revert_reason: Bytes) -> Log {
        Log {
            topics: vec![
                UserOperationRevertReasonFilter::signature(),
                hash,
                H256::from(sender),
            ],
            data: encode(&[Token::Uint(5.into()), Token::Bytes(revert_reason.to_vec())]).into(),
            ..Default::default()
        }
    }

    #[test]
    fn decode_failed_op_from_event() {
        let hash = H256::random();
        let failed_op = [
            FailedOp::selector().to_vec(),
            encode(&[Token::Uint(0.into()), Token::String("AA33 reverted".into())]),
        ]
        .concat();
        let logs =
            vec![Log::default(), revert_reason_log(hash, Address::random(), failed_op.into())];

        let reason = find_revert_reason(&logs, Some(&hash.into())).unwrap();
        assert_eq!(
            reason,
            RevertReason::FailedOp { op_index: 0.into(), reason: "AA33 reverted".into() }
        );
        assert_eq!(reason.reason(), Some("AA33 reverted"));

        // event of another user operation
        assert_eq!(find_revert_reason(&logs, Some(&H256::random().into())), None);
    }

    #[test]
    fn decode_revert_string_and_raw() {
        let data = Bytes::from_str("0x08c379a00000000000000000000000000000000000000000000000000000000000000020000000000000000000000000000000000000000000000000000000000000001841413934206761732076616c756573206f766572666c6f770000000000000000").unwrap();
        assert_eq!(
            decode_revert_reason(&data),
            RevertReason::RevertString("AA94 gas values overflow".into())
        );

        let data = Bytes::from_str("0xdeadbeef").unwrap();
        assert_eq!(decode_revert_reason(&data), RevertReason::Raw(data.clone()));
        assert_eq!(decode_revert_reason(&data).to_string(), "0xdeadbeef");
        assert_eq!(decode_revert_reason(&Bytes::default()), RevertReason::Raw(Bytes::default()));
    }

    #[test]
    fn find_user_operation_event_by_hash() {
        let hash = H256::random();
        let log = Log {
            topics: vec![
                UserOperationEventFilter::signature(),
                hash,
                H256::from(Address::random()),
                H256::zero(),
            ],
            data: encode(&[
                Token::Uint(5.into()),
                Token::Bool(false),
                Token::Uint(1_000.into()),
                Token::Uint(100.into()),
            ])
            .into(),
            ..Default::default()
        };

        let event = find_user_operation_event(&[log], Some(&hash.into())).unwrap();
        assert!(!event.success);
        assert_eq!(event.nonce, 5.into());
        assert_eq!(event.actual_gas_used, 100.into());
    }
}
