mod common;

use common::{
    failed_op, latest_block, nonce, revert_reason_event, transaction_receipt,
    user_operation_event, TestContext,
};
use ethers::{
    providers::{JsonRpcError, MockResponse},
    types::{Signature, H256, U256},
};
use gasless_client::{
    HashStrategy, PipelineError, ReceiptStatus, Stage, SubmissionHandle, SubmitError, Transport,
};
use gasless_contracts::RevertReason;
use gasless_primitives::{dummy_signature, UserOperationRequest};
use serde_json::json;

#[tokio::test]
async fn sponsored_transfer_through_bundler() -> eyre::Result<()> {
    let ctx = TestContext::new(|config| config.hash_strategy = HashStrategy::Checked);
    let hash = ctx.expected_hash(5);

    // chain: getNonce (build), latest block, getUserOpHash, getNonce (pre-flight)
    ctx.eth.push(nonce(5))?;
    ctx.eth.push(hash.0)?;
    ctx.eth.push(latest_block())?;
    ctx.eth.push(nonce(5))?;

    let uo = ctx.pipeline.prepare(ctx.sender, ctx.transfer_call_data()).await?;
    assert_eq!(uo.hash(), hash);
    assert_eq!(
        uo.user_operation().clone().signature(Default::default()),
        ctx.expected_user_operation(5)
    );
    assert_eq!(uo.signature.len(), 65);
    let signature = Signature::try_from(uo.signature.as_ref())?;
    assert_eq!(signature.recover(uo.hash().0)?, ctx.owner);

    let receipt = transaction_receipt(1, vec![user_operation_event(&hash, ctx.sender, true)]);
    // bundler: eth_sendUserOperation, then eth_getUserOperationReceipt
    ctx.bundler.push(json!({
        "userOpHash": hash,
        "entryPoint": ctx.pipeline.config().entry_point,
        "sender": ctx.sender,
        "nonce": "0x5",
        "paymaster": ctx.paymaster.paymaster,
        "actualGasCost": "0x5af3107a4000",
        "actualGasUsed": "0x17318",
        "success": true,
        "logs": [user_operation_event(&hash, ctx.sender, true)],
        "receipt": receipt,
    }))?;
    ctx.bundler.push(json!(null))?;
    ctx.bundler.push(hash)?;

    let handle = ctx.pipeline.submit(&uo).await?;
    assert_eq!(handle, SubmissionHandle::Bundler(hash));

    let outcome = ctx.pipeline.wait(&handle).await?;
    assert_eq!(outcome.status, ReceiptStatus::Success);
    assert_eq!(outcome.transaction_hash, receipt.transaction_hash);
    assert_eq!(outcome.gas_used, Some(95_000.into()));
    assert_eq!(outcome.user_operation_hash, Some(hash));

    // the entry point moved on to the next nonce
    ctx.eth.push(nonce(6))?;
    let next = ctx.pipeline.entry_point().get_nonce(&ctx.sender, U256::zero()).await?;
    assert_eq!(next, 6.into());

    Ok(())
}

#[tokio::test]
async fn stale_nonce_is_rejected_before_sending() -> eyre::Result<()> {
    let ctx = TestContext::new(|config| config.hash_strategy = HashStrategy::Local);

    // another submission landed between build and pre-flight
    ctx.eth.push(nonce(6))?;
    ctx.eth.push(latest_block())?;
    ctx.eth.push(nonce(5))?;

    let uo = ctx.pipeline.prepare(ctx.sender, ctx.transfer_call_data()).await?;
    assert_eq!(uo.hash(), ctx.expected_hash(5));

    let err = ctx.pipeline.submit(&uo).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Submit);
    assert!(!err.is_retryable());
    match err {
        PipelineError::Submit(SubmitError::NonceMismatch { expected, current }) => {
            assert_eq!(expected, 5.into());
            assert_eq!(current, 6.into());
        }
        other => panic!("unexpected {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn bundler_rejection_falls_back_to_direct() -> eyre::Result<()> {
    let ctx = TestContext::new(|config| {
        config.hash_strategy = HashStrategy::Local;
        config.direct_fallback = true;
    });
    let hash = ctx.expected_hash(5);
    let tx_hash = H256::random();
    let mut receipt = transaction_receipt(1, vec![user_operation_event(&hash, ctx.sender, true)]);
    receipt.transaction_hash = tx_hash;

    // chain: getNonce (build), latest block, getNonce (bundler pre-flight), getNonce (direct
    // pre-flight), eth_getTransactionCount, eth_estimateGas, latest block,
    // eth_sendRawTransaction, eth_getTransactionReceipt
    ctx.eth.push(receipt)?;
    ctx.eth.push(tx_hash)?;
    ctx.eth.push(latest_block())?;
    ctx.eth.push(U256::from(400_000))?;
    ctx.eth.push(U256::from(12))?;
    ctx.eth.push(nonce(5))?;
    ctx.eth.push(nonce(5))?;
    ctx.eth.push(latest_block())?;
    ctx.eth.push(nonce(5))?;

    ctx.bundler.push_response(MockResponse::Error(JsonRpcError {
        code: -32500,
        message: "user operation gas efficiency too low".into(),
        data: None,
    }));

    let uo = ctx.pipeline.prepare(ctx.sender, ctx.transfer_call_data()).await?;
    let handle = ctx.pipeline.submit_with(&uo, Transport::Bundler).await?;
    assert_eq!(
        handle,
        SubmissionHandle::Direct { transaction_hash: tx_hash, user_operation_hash: hash }
    );

    let outcome = ctx.pipeline.wait(&handle).await?;
    assert!(outcome.is_success());
    assert_eq!(outcome.transaction_hash, tx_hash);
    assert_eq!(outcome.block_number, Some(1_000.into()));

    Ok(())
}

#[tokio::test]
async fn bundler_rejection_is_reported_verbatim() -> eyre::Result<()> {
    let ctx = TestContext::new(|config| config.hash_strategy = HashStrategy::Local);

    ctx.eth.push(nonce(5))?;
    ctx.eth.push(latest_block())?;
    ctx.eth.push(nonce(5))?;
    ctx.bundler.push_response(MockResponse::Error(JsonRpcError {
        code: -32501,
        message: "AA31 paymaster deposit too low".into(),
        data: None,
    }));

    let uo = ctx.pipeline.prepare(ctx.sender, ctx.transfer_call_data()).await?;
    match ctx.pipeline.submit(&uo).await {
        Err(PipelineError::Submit(SubmitError::Rpc { code, message, .. })) => {
            assert_eq!(code, -32501);
            assert_eq!(message, "AA31 paymaster deposit too low");
        }
        other => panic!("unexpected {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn reverted_user_operation_reason() -> eyre::Result<()> {
    let ctx = TestContext::new(|config| config.hash_strategy = HashStrategy::Local);
    let hash = ctx.expected_hash(5);

    ctx.eth.push(nonce(5))?;
    ctx.eth.push(latest_block())?;
    ctx.eth.push(nonce(5))?;

    let logs = vec![
        revert_reason_event(&hash, ctx.sender, failed_op(0, "AA33 reverted")),
        user_operation_event(&hash, ctx.sender, false),
    ];
    ctx.bundler.push(json!({
        "userOpHash": hash,
        "sender": ctx.sender,
        "nonce": "0x5",
        "actualGasCost": "0x5af3107a4000",
        "actualGasUsed": "0x17318",
        "success": false,
        "reason": "",
        "logs": logs.clone(),
        "receipt": transaction_receipt(1, logs),
    }))?;
    ctx.bundler.push(hash)?;

    let outcome = ctx.pipeline.send(ctx.sender, ctx.transfer_call_data()).await?;
    assert_eq!(outcome.status, ReceiptStatus::OperationReverted);
    assert_eq!(
        outcome.revert,
        Some(RevertReason::FailedOp { op_index: 0.into(), reason: "AA33 reverted".into() })
    );

    Ok(())
}

#[tokio::test]
async fn hash_mismatch_stops_before_signing() -> eyre::Result<()> {
    let ctx = TestContext::new(|config| config.hash_strategy = HashStrategy::Checked);

    ctx.eth.push(H256::random())?;
    ctx.eth.push(latest_block())?;
    ctx.eth.push(nonce(5))?;

    let err = ctx.pipeline.prepare(ctx.sender, ctx.transfer_call_data()).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Hash);
    assert!(!err.is_retryable());

    Ok(())
}

#[tokio::test]
async fn gas_estimation_through_bundler() -> eyre::Result<()> {
    let ctx = TestContext::new(|_| {});

    // chain: getNonce (build), latest block
    ctx.eth.push(latest_block())?;
    ctx.eth.push(nonce(5))?;
    ctx.bundler.push(json!({
        "preVerificationGas": "0xea60",
        "verificationGasLimit": "0x249f0",
        "callGasLimit": "0x30d40"
    }))?;

    let estimation = ctx.pipeline.estimate(ctx.sender, ctx.transfer_call_data()).await?;
    assert_eq!(estimation.call_gas_limit, 200_000.into());
    assert_eq!(estimation.paymaster_verification_gas_limit, None);

    let uo = ctx.expected_user_operation(5).signature(dummy_signature());
    ctx.bundler.assert_request(
        "eth_estimateUserOperationGas",
        (UserOperationRequest::try_from(&uo)?, ctx.pipeline.config().entry_point),
    )?;

    Ok(())
}
