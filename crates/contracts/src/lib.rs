//! Entry point v0.7 bindings, the sender account and token call encoders, and revert decoding
pub mod entry_point;
mod error;
mod gen;
pub mod revert;
pub mod utils;

pub use entry_point::EntryPoint;
pub use error::{decode_revert_error, decode_revert_string, EntryPointError};
pub use gen::{
    entry_point_api, simple_account_api, token_api, FailedOp, FailedOpWithRevert,
    PostOpReverted, UserOperationEventFilter, UserOperationRevertReasonFilter,
};
pub use revert::{
    decode_revert_reason, find_revert_reason, find_user_operation_event, RevertReason,
};
