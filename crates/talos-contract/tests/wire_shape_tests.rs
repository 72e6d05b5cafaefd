//! Integration tests for request/response wire shapes.

use serde_json::{Value, json};
use talos_contract::{
    ApiError, DecryptRequest, FailureClass, KeyRequest, SaveRequest, TreeNode,
    classify_api_error, parse_decrypted_blob, parse_json,
};

#[test]
fn wire_shape_tests_save_request_sends_null_original_path() {
    let request = SaveRequest {
        path: "Work/mail".to_string(),
        content: "pw\nUser: bob".to_string(),
        original_path: None,
    };

    let value = serde_json::to_value(&request).expect("save request should serialize");
    assert_eq!(
        value,
        json!({"path": "Work/mail", "content": "pw\nUser: bob", "original_path": null})
    );
    assert!(!format!("{request:?}").contains("pw\nUser"));
}

#[test]
fn wire_shape_tests_key_and_decrypt_bodies() {
    let login = serde_json::to_value(KeyRequest::new("master")).expect("key body");
    assert_eq!(login, json!({"key": "master"}));

    let decrypt = serde_json::to_value(DecryptRequest {
        path: "a/b".to_string(),
        reveal: false,
    })
    .expect("decrypt body");
    assert_eq!(decrypt, json!({"path": "a/b", "reveal": false}));
}

#[test]
fn wire_shape_tests_decrypt_blob_accepts_string_or_json() {
    assert_eq!(parse_decrypted_blob(r#""pw\nUser: bob""#), "pw\nUser: bob");
    assert_eq!(parse_decrypted_blob(r#"{"a":1}"#), r#"{"a":1}"#);
    assert_eq!(parse_decrypted_blob("plain text"), "plain text");
}

#[test]
fn wire_shape_tests_tree_lists_records_depth_first() {
    let raw = r#"[
        {"name":"Work","path":"Work","is_dir":true,"children":[
            {"name":"mail","path":"Work/mail","is_dir":false,"children":null}
        ]},
        {"name":"bank","path":"bank","is_dir":false}
    ]"#;

    let nodes: Vec<TreeNode> = parse_json(raw).expect("tree should parse");
    assert_eq!(TreeNode::record_paths(&nodes), vec!["Work/mail", "bank"]);

    let round_trip: Value = serde_json::to_value(&nodes).expect("tree should serialize");
    assert_eq!(round_trip[0]["children"][0]["path"], "Work/mail");
}

#[test]
fn wire_shape_tests_failure_classes() {
    assert_eq!(
        classify_api_error(&ApiError::Transport("refused".to_string())),
        FailureClass::Availability
    );
    assert_eq!(
        classify_api_error(&ApiError::Domain {
            status: 401,
            message: "Invalid Master Key".to_string(),
        }),
        FailureClass::Domain
    );
    assert_eq!(
        classify_api_error(&ApiError::Validation("name required".to_string())),
        FailureClass::Validation
    );

    let domain = ApiError::Domain {
        status: 409,
        message: "Category is not empty.".to_string(),
    };
    assert_eq!(domain.user_message(), "Category is not empty.");
    assert_eq!(
        ApiError::UnexpectedStatus(502).user_message(),
        talos_contract::GENERIC_FAILURE_MESSAGE
    );
}
