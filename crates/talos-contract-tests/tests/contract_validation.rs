//! Validates contract fixtures and client bodies against frozen JSON schemas.

use jsonschema::JSONSchema;
use serde_json::Value;
use talos_contract::{
    AuthMethod, AuthStatus, DecryptRequest, ErrorBody, HealthReport, SaveRequest, TreeNode,
    parse_error_message, parse_json,
};

fn contract_path(name: &str) -> String {
    format!("{}/../../contracts/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn load_json(name: &str) -> Value {
    let raw = std::fs::read_to_string(contract_path(name)).expect("json file should be readable");
    serde_json::from_str(&raw).expect("json file should be valid")
}

fn compile_validator(schema: &str) -> JSONSchema {
    let schema = load_json(&format!("{schema}.schema.json"));
    JSONSchema::compile(&schema).expect("schema should compile")
}

fn assert_fixture_valid(contract: &str) {
    let validator = compile_validator(contract);
    let fixture = load_json(&format!("fixtures/{contract}.valid.json"));
    assert!(
        validator.is_valid(&fixture),
        "{contract} fixture should validate against schema"
    );
}

#[test]
fn fixtures_match_schemas() {
    for contract in [
        "auth-status",
        "health-report",
        "decrypt-request",
        "save-request",
        "tree",
        "error-body",
    ] {
        assert_fixture_valid(contract);
    }
}

#[test]
fn decrypt_request_body_matches_schema() {
    let validator = compile_validator("decrypt-request");
    let body = serde_json::to_value(DecryptRequest {
        path: "web/mail".to_string(),
        reveal: true,
    })
    .expect("body should serialize");

    assert!(validator.is_valid(&body));
}

#[test]
fn save_request_body_matches_schema() {
    let validator = compile_validator("save-request");
    let created = SaveRequest {
        path: "web/mail".to_string(),
        content: "s3cret\nUser: alice".to_string(),
        original_path: None,
    };
    let renamed = SaveRequest {
        path: "web/inbox".to_string(),
        content: "s3cret".to_string(),
        original_path: Some("web/mail".to_string()),
    };

    for request in [&created, &renamed] {
        let body = serde_json::to_value(request).expect("body should serialize");
        assert!(validator.is_valid(&body));
    }
}

#[test]
fn auth_status_round_trips_through_schema() {
    let validator = compile_validator("auth-status");
    let status = AuthStatus {
        initialized: true,
        authenticated: true,
        auth_method: Some(AuthMethod::MasterKey),
    };
    let body = serde_json::to_value(status).expect("status should serialize");
    assert!(validator.is_valid(&body));

    let fixture: AuthStatus =
        parse_json(&load_json("fixtures/auth-status.valid.json").to_string()).expect("fixture parses");
    assert_eq!(fixture.auth_method, Some(AuthMethod::MutualTls));
}

#[test]
fn health_fixture_parses_bunker_status_string() {
    let report: HealthReport = parse_json(&load_json("fixtures/health-report.valid.json").to_string())
        .expect("fixture parses");
    assert!(report.is_healthy());

    let validator = compile_validator("health-report");
    let body = serde_json::to_value(HealthReport::offline()).expect("report should serialize");
    assert!(validator.is_valid(&body));
}

#[test]
fn tree_fixture_lists_records_depth_first() {
    let nodes: Vec<TreeNode> =
        parse_json(&load_json("fixtures/tree.valid.json").to_string()).expect("fixture parses");
    assert_eq!(TreeNode::record_paths(&nodes), vec!["web/mail", "wifi"]);
}

#[test]
fn error_fixture_yields_user_message() {
    let raw = load_json("fixtures/error-body.valid.json").to_string();
    let body: ErrorBody = parse_json(&raw).expect("fixture parses");
    assert_eq!(body.error, "Invalid Master Key");
    assert_eq!(parse_error_message(&raw).as_deref(), Some("Invalid Master Key"));
}

#[test]
fn schema_rejects_request_without_reveal_flag() {
    let validator = compile_validator("decrypt-request");
    let body = serde_json::json!({ "path": "web/mail" });
    assert!(!validator.is_valid(&body));
}
