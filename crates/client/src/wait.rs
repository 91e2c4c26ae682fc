//! Confirmation of submitted user operations
//!
//! A bundler handle is resolved with `eth_getUserOperationReceipt` on the bundler, a direct handle
//! with `eth_getTransactionReceipt` on the chain. The two hashes are never used interchangeably.
//!
//! When the outcome is a failure the revert reason is recovered from the
//! `UserOperationRevertReason` event of the user operation. A reverted `handleOps` transaction
//! emits no events, so it is replayed at its parent block to get the entry point error instead.

use crate::{
    error::{ConfirmError, SubmitError},
    retry::{poll, RetryOpts},
    submit::{BundlerClient, SubmissionHandle},
};
use ethers::{
    providers::{JsonRpcClient, Middleware},
    types::{BlockId, BlockNumber, Bytes, TransactionReceipt, TransactionRequest, H256, U256, U64},
};
use gasless_contracts::{
    decode_revert_reason, find_revert_reason, find_user_operation_event, EntryPoint, RevertReason,
};
use gasless_primitives::{UserOperationHash, UserOperationReceipt};
use std::{str::FromStr, time::Duration};
use strum::Display;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ReceiptStatus {
    Success,
    /// The whole `handleOps` transaction reverted
    Reverted,
    /// The transaction succeeded but the execution of the user operation reverted
    OperationReverted,
}

/// Outcome of a submitted user operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub status: ReceiptStatus,
    pub transaction_hash: H256,
    pub block_number: Option<U64>,
    pub gas_used: Option<U256>,
    pub user_operation_hash: Option<UserOperationHash>,
    pub revert: Option<RevertReason>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

#[derive(Clone)]
pub struct ConfirmationWaiter<M: Middleware + 'static, P: JsonRpcClient> {
    entry_point: EntryPoint<M>,
    bundler: Option<BundlerClient<P>>,
    poll: RetryOpts,
    deadline: Duration,
}

impl<M: Middleware + 'static, P: JsonRpcClient> ConfirmationWaiter<M, P> {
    pub fn new(
        entry_point: EntryPoint<M>,
        bundler: Option<BundlerClient<P>>,
        poll: RetryOpts,
        deadline: Duration,
    ) -> Self {
        Self { entry_point, bundler, poll, deadline }
    }

    /// Waits for the outcome of the submission, bounded by the polling attempts and the deadline
    pub async fn wait(&self, handle: &SubmissionHandle) -> Result<Receipt, ConfirmError> {
        let started = Instant::now();
        let timed_out =
            || ConfirmError::Timeout { handle: handle.to_string(), elapsed: started.elapsed() };

        let receipt = match timeout(self.deadline, self.poll_receipt(handle)).await {
            Ok(Ok(Some(receipt))) => receipt,
            Ok(Ok(None)) | Err(_) => return Err(timed_out()),
            Ok(Err(err)) => return Err(err),
        };

        match &receipt.revert {
            Some(reason) => {
                info!("{handle} included in {:?} with {reason}", receipt.transaction_hash)
            }
            None => {
                info!("{handle} included in {:?} ({})", receipt.transaction_hash, receipt.status)
            }
        }
        Ok(receipt)
    }

    async fn poll_receipt(
        &self,
        handle: &SubmissionHandle,
    ) -> Result<Option<Receipt>, ConfirmError> {
        match handle {
            SubmissionHandle::Bundler(hash) => {
                let bundler = self.bundler.as_ref().ok_or(ConfirmError::MissingBundler)?;
                let receipt = poll(
                    "get user operation receipt",
                    || bundler.get_user_operation_receipt(hash),
                    self.poll,
                    SubmitError::is_retryable,
                )
                .await
                .map_err(|err| ConfirmError::Provider { inner: err.to_string() })?;

                match receipt {
                    Some(receipt) => Ok(Some(self.user_operation_outcome(receipt).await)),
                    None => Ok(None),
                }
            }
            SubmissionHandle::Direct { transaction_hash, user_operation_hash } => {
                let eth_client = self.entry_point.eth_client();
                let receipt = poll(
                    "get transaction receipt",
                    || eth_client.get_transaction_receipt(*transaction_hash),
                    self.poll,
                    |_| true,
                )
                .await
                .map_err(|err| ConfirmError::Provider { inner: err.to_string() })?;

                match receipt {
                    Some(receipt) => {
                        Ok(Some(self.transaction_outcome(receipt, user_operation_hash).await))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    async fn user_operation_outcome(&self, receipt: UserOperationReceipt) -> Receipt {
        let hash = receipt.user_operation_hash;
        let tx_receipt = &receipt.tx_receipt;

        let (status, revert) = if tx_receipt.status == Some(U64::zero()) {
            (ReceiptStatus::Reverted, self.replay(tx_receipt).await)
        } else if receipt.success {
            (ReceiptStatus::Success, None)
        } else {
            let revert = find_revert_reason(&receipt.logs, Some(&hash))
                .or_else(|| find_revert_reason(&tx_receipt.logs, Some(&hash)))
                .or_else(|| reason_from_message(&receipt.reason));
            (ReceiptStatus::OperationReverted, revert)
        };

        Receipt {
            status,
            transaction_hash: tx_receipt.transaction_hash,
            block_number: tx_receipt.block_number,
            gas_used: Some(receipt.actual_gas_used),
            user_operation_hash: Some(hash),
            revert,
        }
    }

    async fn transaction_outcome(
        &self,
        receipt: TransactionReceipt,
        hash: &UserOperationHash,
    ) -> Receipt {
        let mut outcome = Receipt {
            status: ReceiptStatus::Success,
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            user_operation_hash: Some(*hash),
            revert: None,
        };

        if receipt.status == Some(U64::zero()) {
            outcome.status = ReceiptStatus::Reverted;
            outcome.revert = self.replay(&receipt).await;
            return outcome;
        }

        let event = find_user_operation_event(&receipt.logs, Some(hash));
        let revert = find_revert_reason(&receipt.logs, Some(hash));
        let success = event.as_ref().map_or(revert.is_none(), |event| event.success);
        if let Some(event) = event {
            outcome.gas_used = Some(event.actual_gas_used);
        }
        if !success {
            outcome.status = ReceiptStatus::OperationReverted;
            outcome.revert = revert;
        }

        outcome
    }

    /// Replays the reverted transaction at its parent block to recover the entry point error
    async fn replay(&self, receipt: &TransactionReceipt) -> Option<RevertReason> {
        let eth_client = self.entry_point.eth_client();
        let tx = match eth_client.get_transaction(receipt.transaction_hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                warn!("Transaction {:?} to replay not found", receipt.transaction_hash);
                return None;
            }
            Err(err) => {
                warn!("Failed to get transaction {:?}: {err:?}", receipt.transaction_hash);
                return None;
            }
        };

        let mut call = TransactionRequest::new().from(tx.from).data(tx.input).value(tx.value);
        if let Some(to) = tx.to {
            call = call.to(to);
        }
        let block = receipt
            .block_number
            .map(|number| BlockId::Number(BlockNumber::Number(number.saturating_sub(U64::one()))));

        debug!("Replaying transaction {:?} at block {block:?}", receipt.transaction_hash);
        match self.entry_point.replay(&call.into(), block).await {
            Ok(reason) => reason,
            Err(err) => {
                warn!("Failed to replay transaction {:?}: {err}", receipt.transaction_hash);
                None
            }
        }
    }
}

/// Reason string of a bundler receipt, hex revert data or plain text
fn reason_from_message(reason: &str) -> Option<RevertReason> {
    if reason.is_empty() {
        return None;
    }
    Some(match Bytes::from_str(reason) {
        Ok(data) => decode_revert_reason(&data),
        Err(_) => RevertReason::RevertString(reason.to_string()),
    })
}
