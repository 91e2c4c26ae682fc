use ethers::{
    contract::{abigen, EthCall},
    types::Selector,
};
use lazy_static::lazy_static;
use std::collections::HashMap;

abigen!(
    EntryPointAPI,
    r#"[
        struct PackedUserOperation {address sender;uint256 nonce;bytes initCode;bytes callData;bytes32 accountGasLimits;uint256 preVerificationGas;bytes32 gasFees;bytes paymasterAndData;bytes signature;}
        function handleOps(PackedUserOperation[] calldata ops,address payable beneficiary) external;
        function getUserOpHash(PackedUserOperation calldata userOp) external view returns (bytes32)
        function getNonce(address sender, uint192 key) public view returns (uint256 nonce)
        error FailedOp(uint256 opIndex, string reason)
        error FailedOpWithRevert(uint256 opIndex, string reason, bytes inner)
        error PostOpReverted(bytes returnData)
        event UserOperationRevertReason(bytes32 indexed userOpHash,address indexed sender,uint256 nonce,bytes revertReason)
        event UserOperationEvent(bytes32 indexed userOpHash,address indexed sender,address indexed paymaster,uint256 nonce,bool success,uint256 actualGasCost,uint256 actualGasUsed)
    ]"#
);

abigen!(
    SimpleAccountAPI,
    r#"[
        function execute(address dest, uint256 value, bytes calldata func) external
    ]"#
);

abigen!(
    TokenAPI,
    r#"[
        function transfer(address to, uint256 amount) external returns (bool)
        function approve(address spender, uint256 amount) external returns (bool)
    ]"#
);

lazy_static! {
    pub static ref SELECTORS_NAMES: HashMap<Selector, String> = {
        let mut map = HashMap::new();
        // entry point
        map.insert(entry_point_api::HandleOpsCall::selector(), entry_point_api::HandleOpsCall::function_name().into());
        map.insert(entry_point_api::GetUserOpHashCall::selector(), entry_point_api::GetUserOpHashCall::function_name().into());
        map.insert(entry_point_api::GetNonceCall::selector(), entry_point_api::GetNonceCall::function_name().into());
        // account
        map.insert(simple_account_api::ExecuteCall::selector(), simple_account_api::ExecuteCall::function_name().into());
        // token
        map.insert(token_api::TransferCall::selector(), token_api::TransferCall::function_name().into());
        map.insert(token_api::ApproveCall::selector(), token_api::ApproveCall::function_name().into());

        map
    };
}
