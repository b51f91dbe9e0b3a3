use lookout_http::{Auth, HttpClient, HttpError, RequestOpts, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn post_json_sends_header_auth_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("x-api-key", "k-123"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "q": "rust" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let got: Value = client
        .post_json_opts(
            "search",
            &json!({ "q": "rust" }),
            RequestOpts {
                auth: Some(Auth::header("x-api-key", "k-123").unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(got, json!({ "ok": true }));
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "error": { "message": "bad key" } })),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .post_json_opts::<_, Value>("x", &json!({}), RequestOpts::default())
        .await
        .unwrap_err();

    match err {
        HttpError::Api {
            status, message, ..
        } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "bad key");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn get_text_accepts_absolute_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>hola</p>"))
        .mount(&server)
        .await;

    let client = HttpClient::new("https://unused.invalid").unwrap();
    let (status, text) = client
        .get_text(
            &format!("{}/page", server.uri()),
            RequestOpts {
                allow_absolute: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "<p>hola</p>");
}

#[tokio::test]
async fn get_text_returns_error_pages_with_their_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<p>Acceso denegado</p>"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let (status, text) = client
        .get_text("private", RequestOpts::default())
        .await
        .unwrap();

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(text, "<p>Acceso denegado</p>");
}

#[tokio::test]
async fn get_text_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_text(
            "slow",
            RequestOpts {
                timeout: Some(Duration::from_millis(50)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Network(_)), "got {err:?}");
}
