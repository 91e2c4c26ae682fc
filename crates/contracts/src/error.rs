use crate::gen::{EntryPointAPIErrors, FailedOp, FailedOpWithRevert};
use ethers::{
    abi::AbiDecode,
    providers::{JsonRpcError, Middleware, MiddlewareError, ProviderError},
    types::Bytes,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    static ref HEX_DATA: Regex = Regex::new(r"0x[0-9a-fA-F]+").expect("Regex rules valid");
}

/// Entry point errors
#[derive(Debug, Error, Clone)]
pub enum EntryPointError {
    /// Failed user operation error
    #[error("{0}")]
    FailedOp(FailedOp),

    /// Failed user operation error with the inner revert data
    #[error("{0}")]
    FailedOpWithRevert(FailedOpWithRevert),

    /// execution reverted
    #[error("execution reverted: {0}")]
    ExecutionReverted(String),

    /// Provider error
    #[error("provider error: {inner}")]
    Provider {
        /// The inner error message
        inner: String,
    },

    /// ABI error
    #[error("abi error: {inner}")]
    ABI {
        /// The inner error message
        inner: String,
    },

    /// Data decoding error
    #[error("decode error: {inner}")]
    Decode {
        /// The inner error message
        inner: String,
    },

    /// Any other error
    #[error("other error: {inner}")]
    Other {
        /// The inner error message
        inner: String,
    },
}

impl EntryPointError {
    /// Whether the error came from the transport rather than from the entry point
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }

    /// Maps an entry point custom error (or revert string) to the error
    pub fn from_revert(err: EntryPointAPIErrors) -> Self {
        match err {
            EntryPointAPIErrors::FailedOp(err) => Self::FailedOp(err),
            EntryPointAPIErrors::FailedOpWithRevert(err) => Self::FailedOpWithRevert(err),
            EntryPointAPIErrors::RevertString(reason) => Self::ExecutionReverted(reason),
            other => Self::ExecutionReverted(other.to_string()),
        }
    }

    pub fn from_provider_error(err: &ProviderError) -> Result<EntryPointAPIErrors, Self> {
        match err {
            ProviderError::JsonRpcClientError(err) => err
                .as_error_response()
                .map(Self::from_json_rpc_error)
                .unwrap_or(Err(EntryPointError::Provider {
                    inner: format!("unknown json-rpc client error: {err:?}"),
                })),
            ProviderError::HTTPError(err) => {
                Err(EntryPointError::Provider { inner: format!("HTTP error: {err:?}") })
            }
            _ => {
                Err(EntryPointError::Provider { inner: format!("unknown provider error: {err:?}") })
            }
        }
    }

    pub fn from_json_rpc_error(err: &JsonRpcError) -> Result<EntryPointAPIErrors, Self> {
        if let Some(ref value) = err.data {
            match value {
                serde_json::Value::String(data) => {
                    let hex = if let Some(hex) = HEX_DATA.find(data) {
                        hex
                    } else {
                        return Err(EntryPointError::Decode {
                            inner: format!("hex string not found in {data:?}"),
                        });
                    };

                    let bytes = match Bytes::from_str(hex.into()) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            return Err(EntryPointError::Decode {
                                inner: format!(
                                    "string {data:?} could not be converted to bytes: {e:?}",
                                ),
                            })
                        }
                    };

                    return decode_revert_error(bytes);
                }
                other => {
                    return Err(Self::Decode {
                        inner: format!("json-rpc return data is not a string: {other:?}"),
                    })
                }
            }
        }

        // nodes that drop the revert data still report the revert in the message
        if err.message.contains("execution reverted") {
            return Err(Self::ExecutionReverted(err.message.clone()));
        }

        Err(Self::Provider { inner: format!("json-rpc error doesn't contain data field: {err:?}") })
    }

    pub fn from_middleware_error<M: Middleware>(
        err: M::Error,
    ) -> Result<EntryPointAPIErrors, Self> {
        if let Some(err) = err.as_error_response() {
            return Self::from_json_rpc_error(err);
        }

        if let Some(err) = err.as_provider_error() {
            return Self::from_provider_error(err);
        }

        Err(Self::Provider { inner: format!("middleware error: {err:?}") })
    }
}

/// Revert data carried by a JSON-RPC error, if any
pub(crate) fn revert_data(err: &JsonRpcError) -> Option<Bytes> {
    let data = err.data.as_ref()?.as_str()?;
    Bytes::from_str(HEX_DATA.find(data)?.as_str()).ok()
}

// ethers-rs could not handle `require (true, "reason")` or `revert("test failed")` well in this
// case revert with `require` error would ends up with error event signature `0x08c379a0`
// we need to handle it manually
pub fn decode_revert_string(data: Bytes) -> Option<String> {
    if data.len() < 4 {
        return None;
    }
    let (error_sig, reason) = data.split_at(4);
    if error_sig == [0x08, 0xc3, 0x79, 0xa0] {
        <String as AbiDecode>::decode(reason).ok()
    } else {
        None
    }
}

pub fn decode_revert_error(data: Bytes) -> Result<EntryPointAPIErrors, EntryPointError> {
    let decoded = EntryPointAPIErrors::decode(data.as_ref());
    match decoded {
        Ok(res) => Ok(res),
        Err(e) => {
            if let Some(error_str) = decode_revert_string(data) {
                return Ok(EntryPointAPIErrors::RevertString(error_str));
            };

            Err(EntryPointError::Decode {
                inner: format!(
                    "data field can't be deserialized to EntryPointAPIErrors error: {e:?}",
                ),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAILED_OP_AA40: &str = "0x220266b600000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000040000000000000000000000000000000000000000000000000000000000000001e41413430206f76657220766572696669636174696f6e4761734c696d69740000";

    #[test]
    fn deserialize_error_msg() -> eyre::Result<()> {
        let err_msg = Bytes::from_str("0x08c379a00000000000000000000000000000000000000000000000000000000000000020000000000000000000000000000000000000000000000000000000000000001841413934206761732076616c756573206f766572666c6f770000000000000000")?;
        let res = decode_revert_error(err_msg)?;
        match res {
            EntryPointAPIErrors::RevertString(s) => {
                assert_eq!(s, "AA94 gas values overflow")
            }
            _ => panic!("Invalid error message"),
        }

        assert_eq!(decode_revert_string(Bytes::from_str("0x08c3")?), None);
        Ok(())
    }

    #[test]
    fn deserialize_failed_op() -> eyre::Result<()> {
        let err_msg = Bytes::from_str(FAILED_OP_AA40)?;
        let res = EntryPointAPIErrors::decode(err_msg)?;
        match res {
            EntryPointAPIErrors::FailedOp(f) => {
                assert_eq!(f.reason, "AA40 over verificationGasLimit")
            }
            _ => panic!("Invalid error message"),
        }
        Ok(())
    }

    #[test]
    fn json_rpc_error_with_revert_data() {
        let err = JsonRpcError {
            code: 3,
            message: "execution reverted".into(),
            data: Some(serde_json::Value::String(FAILED_OP_AA40.into())),
        };
        let res = EntryPointError::from_json_rpc_error(&err).map(EntryPointError::from_revert);
        match res {
            Ok(EntryPointError::FailedOp(f)) => {
                assert_eq!(f.op_index, 0.into());
                assert_eq!(f.reason, "AA40 over verificationGasLimit");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = JsonRpcError { code: -32000, message: "execution reverted".into(), data: None };
        assert!(matches!(
            EntryPointError::from_json_rpc_error(&err),
            Err(EntryPointError::ExecutionReverted(_))
        ));

        let err = JsonRpcError { code: -32000, message: "header not found".into(), data: None };
        assert!(EntryPointError::from_json_rpc_error(&err).is_err_and(|e| e.is_provider()));
        assert_eq!(revert_data(&err), None);

        let err = JsonRpcError {
            code: 3,
            message: "execution reverted".into(),
            data: Some(serde_json::Value::String("Reverted 0xdeadbeef".into())),
        };
        assert_eq!(revert_data(&err), Some(Bytes::from(vec![0xde, 0xad, 0xbe, 0xef])));
    }
}
