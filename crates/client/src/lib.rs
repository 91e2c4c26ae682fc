//! Client pipeline of sponsored user operations
//!
//! A user operation goes through the [builder](builder::UserOperationBuilder), the
//! [hash oracle](hash::HashOracle), the [wallet](gasless_primitives::Wallet), one of the
//! [submitters](submit::Submit) and the [waiter](wait::ConfirmationWaiter).
//! [Pipeline](pipeline::Pipeline) drives them end to end.

pub mod builder;
pub mod config;
pub mod error;
pub mod fees;
pub mod hash;
pub mod pipeline;
pub mod retry;
pub mod submit;
pub mod wait;

pub use builder::{encode_approve, encode_execute, encode_transfer, GasLimits};
pub use config::{Config, GasConfig, HashStrategy, PaymasterConfig, Transport};
pub use error::{BuildError, ConfirmError, HashError, PipelineError, Stage, SubmitError};
pub use pipeline::Pipeline;
pub use submit::SubmissionHandle;
pub use wait::{Receipt, ReceiptStatus};
