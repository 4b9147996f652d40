use serde_json::json;

use crate::{
    domain::{Address, ChainId, HexBytes, Step, Wei},
    error::{ErrorCode, RpcErrorObject},
    protocol::{
        GrantedPermission, JsonRpcResponse, NativeTokenStream, Permission, PermissionRequest,
        PermissionSigner,
    },
};

fn sample_address() -> Address {
    "0x1111111111111111111111111111111111111111"
        .parse()
        .expect("address")
}

fn sample_request() -> PermissionRequest {
    PermissionRequest {
        chain_id: ChainId::SEPOLIA,
        expiry: 1_700_086_400,
        signer: PermissionSigner::Account {
            address: sample_address(),
        },
        permission: Permission::NativeTokenStream(NativeTokenStream {
            initial_amount: Wei(1),
            amount_per_second: Wei(1),
            start_time: 1_700_000_000,
            max_amount: Wei(10),
            justification: "Payment for a subscription service".to_string(),
        }),
    }
}

#[test]
fn address_accepts_mixed_case_and_renders_lowercase() {
    let address: Address = "0xAbCdEf0000000000000000000000000000000001"
        .parse()
        .expect("address");
    assert_eq!(
        address.to_string(),
        "0xabcdef0000000000000000000000000000000001"
    );
}

#[test]
fn address_rejects_missing_prefix_and_wrong_length() {
    assert!("1111111111111111111111111111111111111111"
        .parse::<Address>()
        .is_err());
    assert!("0x1111".parse::<Address>().is_err());
}

#[test]
fn quantities_decode_hex_strings_and_numbers() {
    let from_hex: ChainId = serde_json::from_value(json!("0xaa36a7")).expect("hex chain id");
    let from_number: ChainId = serde_json::from_value(json!(11155111)).expect("numeric chain id");
    assert_eq!(from_hex, ChainId::SEPOLIA);
    assert_eq!(from_number, ChainId::SEPOLIA);

    let zero: Wei = "0x".parse().expect("empty hex is zero");
    assert_eq!(zero, Wei(0));
    assert!("0xzz".parse::<Wei>().is_err());
}

#[test]
fn permission_request_uses_erc7715_wire_shape() {
    let value = serde_json::to_value(sample_request()).expect("serialize");
    assert_eq!(
        value,
        json!({
            "chainId": "0xaa36a7",
            "expiry": 1_700_086_400u64,
            "signer": {
                "type": "account",
                "data": { "address": "0x1111111111111111111111111111111111111111" }
            },
            "permission": {
                "type": "native-token-stream",
                "data": {
                    "initialAmount": "0x1",
                    "amountPerSecond": "0x1",
                    "startTime": 1_700_000_000u64,
                    "maxAmount": "0xa",
                    "justification": "Payment for a subscription service"
                }
            }
        })
    );
}

#[test]
fn granted_permission_tolerates_unknown_fields_and_optional_meta() {
    let mut value = serde_json::to_value(sample_request()).expect("serialize");
    let object = value.as_object_mut().expect("object");
    object.insert("context".into(), json!("0xdeadbeef"));
    object.insert("isAdjustmentAllowed".into(), json!(true));
    object.insert(
        "signerMeta".into(),
        json!({ "delegationManager": "0x2222222222222222222222222222222222222222" }),
    );

    let granted: GrantedPermission = serde_json::from_value(value).expect("decode granted");
    assert_eq!(granted.request, sample_request());
    assert_eq!(granted.context, HexBytes(vec![0xde, 0xad, 0xbe, 0xef]));
    assert!(granted.account_meta.is_none());
    assert_eq!(
        granted.delegation_manager().map(|a| a.to_string()),
        Some("0x2222222222222222222222222222222222222222".to_string())
    );
}

#[test]
fn rpc_error_response_decodes_without_result() {
    let response: JsonRpcResponse<String> = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": 3,
        "error": { "code": 4001, "message": "User rejected the request." }
    }))
    .expect("decode");
    assert!(response.result.is_none());
    let error = response.error.expect("error object");
    assert_eq!(error.kind(), ErrorCode::UserRejected);
}

#[test]
fn response_ids_may_be_null_or_strings() {
    let parse_error: JsonRpcResponse<String> = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": { "code": -32700, "message": "Parse error" }
    }))
    .expect("decode null id");
    assert!(parse_error.id.is_none());
    assert!(!parse_error.answers(1));

    let echoed: JsonRpcResponse<String> =
        serde_json::from_value(json!({ "jsonrpc": "2.0", "id": "7", "result": "0x1" }))
            .expect("decode string id");
    assert!(echoed.answers(7));
    assert!(!echoed.answers(8));
    assert!(JsonRpcResponse::success(Some(json!(7)), ()).answers(7));
}

#[test]
fn classifies_provider_error_codes() {
    assert_eq!(ErrorCode::from_code(4902), ErrorCode::UnrecognizedChain);
    assert_eq!(ErrorCode::from_code(-32601), ErrorCode::UnsupportedMethod);
    assert_eq!(RpcErrorObject::new(12, "odd").kind(), ErrorCode::Other);
}

#[test]
fn steps_are_numbered_in_flow_order() {
    assert_eq!(Step::AccountCreation.number(), 1);
    assert_eq!(Step::PermissionGranting.number(), 2);
    assert_eq!(Step::PermissionRedemption.number(), 3);
    assert!(Step::PermissionRedemption.is_terminal());
    assert!(!Step::PermissionGranting.is_terminal());
}
