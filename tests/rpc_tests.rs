//! Unit tests for the Solana JSON-RPC client (chains::rpc module)

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use solana_sdk::signature::Signature;
use std::time::Duration;
use swap_workflow::chains::{ChainConnection, ConfirmationLevel, SolanaRpcClient};
use swap_workflow::WorkflowError;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{create_default_chain_config, pubkey, DUMMY_ORDER_ADDRESS};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result
    }))
}

fn create_test_client(server: &MockServer) -> SolanaRpcClient {
    SolanaRpcClient::new(&create_default_chain_config(&server.uri())).unwrap()
}

fn test_signature() -> Signature {
    Signature::from([7u8; 64])
}

// ============================================================================
// QUERY TESTS
// ============================================================================

/// What is tested: block_height() decodes getBlockHeight
/// Why: Expiry detection compares against the current block height
#[tokio::test]
async fn test_block_height() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getBlockHeight" })))
        .respond_with(rpc_result(json!(123456)))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    assert_eq!(client.block_height().await.unwrap(), 123456);
}

/// What is tested: read_account() decodes base64 data and maps a null value to None
/// Why: A missing order account is a normal state for the monitor
#[tokio::test]
async fn test_read_account() {
    let mock_server = MockServer::start().await;
    let data = vec![1u8, 2, 3, 4];

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "getAccountInfo",
            "params": [DUMMY_ORDER_ADDRESS]
        })))
        .respond_with(rpc_result(json!({
            "context": { "slot": 1 },
            "value": {
                "data": [STANDARD.encode(&data), "base64"],
                "executable": false,
                "lamports": 1000,
                "owner": "11111111111111111111111111111111",
                "rentEpoch": 0
            }
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAccountInfo" })))
        .respond_with(rpc_result(json!({ "context": { "slot": 2 }, "value": null })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let address = pubkey(DUMMY_ORDER_ADDRESS);

    assert_eq!(client.read_account(&address).await.unwrap(), Some(data));
    assert_eq!(client.read_account(&address).await.unwrap(), None);
}

/// What is tested: signature_status() decodes errors and confirmation levels
/// Why: The monitor distinguishes failed from landed opening transactions
#[tokio::test]
async fn test_signature_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getSignatureStatuses" })))
        .respond_with(rpc_result(json!({
            "context": { "slot": 10 },
            "value": [{
                "slot": 9,
                "confirmations": null,
                "err": { "InstructionError": [0, { "Custom": 6001 }] },
                "confirmationStatus": "finalized"
            }]
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let status = client.signature_status(&test_signature()).await.unwrap().unwrap();

    assert_eq!(status.slot, 9);
    assert_eq!(status.confirmation_level, Some(ConfirmationLevel::Finalized));
    assert!(status.err.unwrap().contains("6001"));
}

/// What is tested: An unknown signature yields None
/// Why: "Not seen yet" is not an error
#[tokio::test]
async fn test_signature_status_unknown() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getSignatureStatuses" })))
        .respond_with(rpc_result(json!({ "context": { "slot": 10 }, "value": [null] })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    assert!(client.signature_status(&test_signature()).await.unwrap().is_none());
}

// ============================================================================
// SUBMISSION AND CONFIRMATION TESTS
// ============================================================================

/// What is tested: submit_raw() sends base64 and parses the returned signature
/// Why: The signature is what confirmation polls on
#[tokio::test]
async fn test_submit_raw() {
    let mock_server = MockServer::start().await;
    let signature = test_signature();

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "sendTransaction",
            "params": [STANDARD.encode([9u8, 9, 9])]
        })))
        .respond_with(rpc_result(json!(signature.to_string())))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    assert_eq!(client.submit_raw(&[9, 9, 9]).await.unwrap(), signature);
}

/// What is tested: A JSON-RPC error object becomes WorkflowError::Rpc
/// Why: Preflight rejections must carry the node's message
#[tokio::test]
async fn test_rpc_error_object() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32002, "message": "Blockhash not found" }
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    match client.submit_raw(&[1]).await {
        Err(WorkflowError::Rpc { method, message }) => {
            assert_eq!(method, "sendTransaction");
            assert!(message.contains("Blockhash not found"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

/// What is tested: confirm() keeps polling until the signature is confirmed
/// Why: A processed transaction may still be dropped
#[tokio::test]
async fn test_confirm_polls_until_confirmed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getSignatureStatuses" })))
        .respond_with(rpc_result(json!({
            "context": { "slot": 10 },
            "value": [{ "slot": 9, "err": null, "confirmationStatus": "processed" }]
        })))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getSignatureStatuses" })))
        .respond_with(rpc_result(json!({
            "context": { "slot": 11 },
            "value": [{ "slot": 9, "err": null, "confirmationStatus": "confirmed" }]
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let confirmation = client
        .confirm(&test_signature(), Duration::from_secs(5), Duration::from_millis(10))
        .await
        .unwrap();

    assert_eq!(confirmation.signature, test_signature());
    assert_eq!(confirmation.slot, 9);
}

/// What is tested: confirm() gives up with ConfirmTimeout
/// Why: A stalled confirmation must not hang the workflow
#[tokio::test]
async fn test_confirm_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getSignatureStatuses" })))
        .respond_with(rpc_result(json!({ "context": { "slot": 10 }, "value": [null] })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client
        .confirm(&test_signature(), Duration::from_millis(100), Duration::from_millis(10))
        .await;

    assert!(matches!(result, Err(WorkflowError::ConfirmTimeout { .. })));
}
