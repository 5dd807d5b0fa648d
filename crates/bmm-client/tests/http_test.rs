//! HTTP behaviour of BmmClient against a local stub server

use axum::extract::{Json, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bmm_client::{
    BmmClient, BmmError, CreateInstanceRequest, DeleteInstanceStatus, GetInstanceParams,
    InstanceDeleteRequest, InstanceStatus, InterfaceCreateRequest,
};
use serde_json::{json, Value};
use uuid::Uuid;

const TOKEN: &str = "test-token";
const KNOWN: &str = "3f2504e0-4f89-41d3-9a0c-0305e82c3301";
const CONFLICT: &str = "6fa459ea-ee8a-3ca4-894e-db77e160355e";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn create(Path(org): Path<String>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match org.as_str() {
        "empty" => StatusCode::OK.into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => (
            StatusCode::CREATED,
            axum::Json(json!({
                "id": KNOWN,
                "name": body["name"],
                "status": "Pending",
                "interfaces": [{"subnetId": body["interfaces"][0]["subnetId"], "ipAddresses": ["10.1.0.4"]}]
            })),
        )
            .into_response(),
    }
}

async fn fetch(Path((_org, id)): Path<(String, String)>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if id == KNOWN {
        (
            StatusCode::OK,
            axum::Json(json!({"id": KNOWN, "machineId": "fm100ht", "status": "Ready"})),
        )
            .into_response()
    } else {
        (StatusCode::NOT_FOUND, "instance not found").into_response()
    }
}

async fn remove(Path((_org, id)): Path<(String, String)>) -> StatusCode {
    match id.as_str() {
        KNOWN => StatusCode::NO_CONTENT,
        CONFLICT => StatusCode::CONFLICT,
        _ => StatusCode::NOT_FOUND,
    }
}

async fn start_server() -> String {
    let app = Router::new()
        .route("/v2/org/{org}/carbide/instance", post(create))
        .route("/v2/org/{org}/carbide/instance/{id}", get(fetch).delete(remove));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn create_request() -> CreateInstanceRequest {
    CreateInstanceRequest {
        name: "worker-0".to_string(),
        tenant_id: Uuid::new_v4(),
        vpc_id: Uuid::new_v4(),
        interfaces: vec![InterfaceCreateRequest {
            subnet_id: Uuid::new_v4(),
            is_physical: false,
        }],
        instance_type_id: Some(Uuid::new_v4()),
        machine_id: None,
        allow_unhealthy_machine: None,
        user_data: None,
        ssh_key_group_ids: None,
        labels: None,
        phone_home_enabled: Some(true),
    }
}

#[tokio::test]
async fn test_create_instance_returns_payload() {
    let client = BmmClient::new(start_server().await, TOKEN.to_string()).unwrap();
    let instance = client
        .create_instance("test-org", &create_request())
        .await
        .unwrap()
        .expect("instance payload");

    assert_eq!(instance.id.to_string(), KNOWN);
    assert_eq!(instance.name.as_deref(), Some("worker-0"));
    assert_eq!(instance.status, Some(InstanceStatus::Pending));
    assert_eq!(instance.ip_addresses().collect::<Vec<_>>(), vec!["10.1.0.4"]);
}

#[tokio::test]
async fn test_create_instance_without_created_status_is_empty() {
    let client = BmmClient::new(start_server().await, TOKEN.to_string()).unwrap();
    let result = client.create_instance("empty", &create_request()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_create_instance_server_error() {
    let client = BmmClient::new(start_server().await, TOKEN.to_string()).unwrap();
    let err = client.create_instance("broken", &create_request()).await.unwrap_err();
    match err {
        BmmError::Api(message) => assert!(message.contains("500")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_token_is_authentication_error() {
    let client = BmmClient::new(start_server().await, "wrong".to_string()).unwrap();
    let err = client.create_instance("test-org", &create_request()).await.unwrap_err();
    assert!(matches!(err, BmmError::Authentication(_)));

    let id = Uuid::parse_str(KNOWN).unwrap();
    let err = client
        .get_instance("test-org", id, &GetInstanceParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BmmError::Authentication(_)));
}

#[tokio::test]
async fn test_get_instance() {
    let client = BmmClient::new(start_server().await, TOKEN.to_string()).unwrap();
    let id = Uuid::parse_str(KNOWN).unwrap();
    let params = GetInstanceParams {
        include_relation: vec!["Machine".to_string()],
    };
    let instance = client.get_instance("test-org", id, &params).await.unwrap().unwrap();
    assert_eq!(instance.machine_id.as_deref(), Some("fm100ht"));
    assert_eq!(instance.status, Some(InstanceStatus::Ready));

    let err = client
        .get_instance("test-org", Uuid::new_v4(), &GetInstanceParams::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_instance_status_codes() {
    let client = BmmClient::new(start_server().await, TOKEN.to_string()).unwrap();
    let body = InstanceDeleteRequest::default();

    let deleted = client
        .delete_instance("test-org", Uuid::parse_str(KNOWN).unwrap(), &body)
        .await
        .unwrap();
    assert_eq!(deleted, DeleteInstanceStatus::Deleted);

    let gone = client
        .delete_instance("test-org", Uuid::new_v4(), &body)
        .await
        .unwrap();
    assert_eq!(gone, DeleteInstanceStatus::NotFound);

    let conflict = client
        .delete_instance("test-org", Uuid::parse_str(CONFLICT).unwrap(), &body)
        .await
        .unwrap();
    assert_eq!(conflict, DeleteInstanceStatus::Unexpected(409));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_http_error() {
    // Port 9 (discard) is not served locally
    let client = BmmClient::new("http://127.0.0.1:9".to_string(), TOKEN.to_string()).unwrap();
    let err = client
        .delete_instance("test-org", Uuid::new_v4(), &InstanceDeleteRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BmmError::Http(_)));
}
