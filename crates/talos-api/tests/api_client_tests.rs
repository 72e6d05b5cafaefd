//! Integration tests for endpoint mapping and status handling.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use talos_api::{ApiClient, ApiRequest, ApiResponse, ApiTransport, HttpMethod};
use talos_contract::{ApiError, FailureClass, KeyRequest, classify_api_error};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Sent {
    method: HttpMethod,
    url: String,
    body: Option<String>,
}

struct CannedTransport {
    response: Result<ApiResponse, String>,
    sent: Mutex<Vec<Sent>>,
}

impl CannedTransport {
    fn replying(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(ApiResponse {
                status,
                body: body.to_string(),
            }),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(reason.to_string()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("sent lock").clone()
    }
}

#[async_trait]
impl ApiTransport for CannedTransport {
    async fn send(&self, base: &Url, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.sent.lock().expect("sent lock").push(Sent {
            method: request.method,
            url: format!("{}{}", base.as_str().trim_end_matches('/'), request.path),
            body: request.body.as_ref().map(|body| body.as_str().to_string()),
        });
        self.response.clone().map_err(ApiError::Transport)
    }
}

fn client(transport: &Arc<CannedTransport>) -> ApiClient {
    ApiClient::new(
        "https://vault.example.test/",
        Arc::clone(transport) as Arc<dyn ApiTransport>,
    )
    .expect("base url is valid")
}

#[tokio::test]
async fn api_client_tests_decrypt_posts_path_and_reveal_flag() {
    let transport = CannedTransport::replying(200, r#""hunter2\nUser: alice""#);
    let blob = client(&transport)
        .decrypt("Work/github", true)
        .await
        .expect("decrypt succeeds");

    assert_eq!(blob.as_str(), "hunter2\nUser: alice");
    assert_eq!(
        transport.sent(),
        vec![Sent {
            method: HttpMethod::Post,
            url: "https://vault.example.test/api/decrypt".to_string(),
            body: Some(r#"{"path":"Work/github","reveal":true}"#.to_string()),
        }]
    );
}

#[tokio::test]
async fn api_client_tests_error_body_becomes_domain_message() {
    let transport = CannedTransport::replying(401, r#"{"error":"Invalid Master Key"}"#);
    let error = client(&transport)
        .login(&KeyRequest::new("wrong"))
        .await
        .expect_err("login is rejected");

    assert_eq!(error.user_message(), "Invalid Master Key");
    assert_eq!(classify_api_error(&error), FailureClass::Domain);
}

#[tokio::test]
async fn api_client_tests_opaque_error_body_is_availability_failure() {
    let transport = CannedTransport::replying(502, "<html>Bad Gateway</html>");
    let error = client(&transport)
        .delete("Work/github")
        .await
        .expect_err("delete fails");

    assert!(matches!(error, ApiError::UnexpectedStatus(502)));
    assert_eq!(classify_api_error(&error), FailureClass::Availability);
}

#[tokio::test]
async fn api_client_tests_transport_failure_passes_through() {
    let transport = CannedTransport::failing("connection refused");
    let error = client(&transport)
        .tree()
        .await
        .expect_err("tree fails");
    assert!(matches!(error, ApiError::Transport(_)));
}

#[tokio::test]
async fn api_client_tests_malformed_success_body_is_invalid_response() {
    let transport = CannedTransport::replying(200, "{not json");
    let error = client(&transport)
        .auth_status()
        .await
        .expect_err("status body is malformed");
    assert!(matches!(error, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn api_client_tests_tree_lists_records_depth_first() {
    let transport = CannedTransport::replying(
        200,
        r#"[
            {"name":"Work","path":"Work","is_dir":true,"children":[
                {"name":"github","path":"Work/github","is_dir":false,"children":null}
            ]},
            {"name":"bank","path":"bank","is_dir":false}
        ]"#,
    );
    let tree = client(&transport).tree().await.expect("tree parses");
    assert_eq!(
        talos_contract::TreeNode::record_paths(&tree),
        vec!["Work/github", "bank"]
    );
}
