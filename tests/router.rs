//! Provider router integration tests

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use arrowhead_client::provider::{ParamSpec, Provider};
use arrowhead_client::security::{TokenRejected, TokenVerifier};
use arrowhead_client::{Args, HandlerError, HttpMethod, ServiceResponse};

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn car_factory() -> Provider {
    let mut provider = Provider::new("carfactory", "127.0.0.1", 8080);

    provider
        .register(
            "create-car",
            HttpMethod::Post,
            "/car-factory/create-car",
            vec![ParamSpec::required("payload")],
            Arc::new(|args: Args| async move {
                let payload = args
                    .json("payload")
                    .ok_or("payload not bound")?
                    .clone();

                // The router hands over the parsed mapping, not raw bytes
                let brand = payload["brand"].as_str().ok_or("missing brand")?;
                Ok::<_, HandlerError>(ServiceResponse::Json(serde_json::json!({
                    "status": "success",
                    "brand": brand,
                })))
            }),
        )
        .unwrap();

    provider
        .register(
            "get-car",
            HttpMethod::Get,
            "/car-factory/get-car",
            vec![ParamSpec::required("query")],
            Arc::new(|args: Args| async move {
                let query = args.query("query").ok_or("query not bound")?.clone();
                Ok::<_, HandlerError>(ServiceResponse::Json(serde_json::json!({
                    "seen": query,
                })))
            }),
        )
        .unwrap();

    provider
        .register(
            "export-car",
            HttpMethod::Get,
            "/car-factory/export-car",
            vec![],
            Arc::new(|_args: Args| async move {
                Ok::<_, HandlerError>(ServiceResponse::Bytes(vec![0xDE, 0xAD]))
            }),
        )
        .unwrap();

    provider
        .register(
            "crash-car",
            HttpMethod::Post,
            "/car-factory/crash-car",
            vec![],
            Arc::new(|_args: Args| async move {
                Err::<ServiceResponse, HandlerError>("engine failure".into())
            }),
        )
        .unwrap();

    provider
}

#[tokio::test]
async fn test_payload_parameter_binds_parsed_json() {
    let app = car_factory().router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/car-factory/create-car?token=abc123")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"brand":"Toyota","color":"Red"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["brand"], "Toyota");
}

#[tokio::test]
async fn test_token_is_stripped_from_handler_query() {
    let app = car_factory().router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/car-factory/get-car?token=secret&color=Red")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["seen"]["color"], "Red");
    assert!(json["seen"].get("token").is_none());
}

#[tokio::test]
async fn test_byte_results_pass_through() {
    let app = car_factory().router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/car-factory/export-car")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), [0xDE, 0xAD]);
}

#[tokio::test]
async fn test_handler_failure_becomes_json_error_body() {
    let app = car_factory().router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/car-factory/crash-car")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "engine failure");
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let app = car_factory().router();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/car-factory/create-car")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

struct RejectAll;

#[async_trait::async_trait]
impl TokenVerifier for RejectAll {
    async fn verify(
        &self,
        _service_definition: &str,
        _token: Option<&str>,
    ) -> Result<(), TokenRejected> {
        Err(TokenRejected("token rejected by policy".to_string()))
    }
}

#[tokio::test]
async fn test_rejecting_verifier_answers_unauthorized() {
    let mut provider = Provider::new("carfactory", "127.0.0.1", 8080).with_verifier(Arc::new(RejectAll));
    provider
        .register(
            "create-car",
            HttpMethod::Post,
            "/car-factory/create-car",
            vec![ParamSpec::required("payload")],
            Arc::new(|_args: Args| async move {
                Ok::<_, HandlerError>(ServiceResponse::Text("unreachable".to_string()))
            }),
        )
        .unwrap();

    let response = provider
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/car-factory/create-car?token=forged")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("rejected"));
}
