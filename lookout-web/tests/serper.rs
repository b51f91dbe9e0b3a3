use lookout_common::{LookoutError, SearchResult};
use lookout_web::serper::{SearchProvider, SerperApi};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn organic(n: usize) -> Vec<serde_json::Value> {
    (1..=n)
        .map(|i| {
            json!({
                "title": format!("Result {i}"),
                "link": format!("https://site{i}.example/"),
                "snippet": "ignored",
                "position": i
            })
        })
        .collect()
}

async fn api_for(server: &MockServer) -> SerperApi {
    SerperApi::with_endpoint(&format!("{}/search", server.uri()), "serper-key".into()).unwrap()
}

#[tokio::test]
async fn posts_raw_query_with_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("x-api-key", "serper-key"))
        .and(body_json(json!({ "q": "¿clima en Madrid?" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "searchParameters": { "q": "¿clima en Madrid?" },
            "organic": organic(2)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hits = api_for(&server).await.search("¿clima en Madrid?").await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0], SearchResult::new("Result 1", "https://site1.example/"));
    assert_eq!(hits[1].link.as_deref(), Some("https://site2.example/"));
}

#[tokio::test]
async fn keeps_only_the_first_five_in_provider_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "organic": organic(9) })))
        .mount(&server)
        .await;

    let hits = api_for(&server).await.search("rust").await.unwrap();

    let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Result 1", "Result 2", "Result 3", "Result 4", "Result 5"]
    );
}

#[tokio::test]
async fn missing_organic_field_is_an_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answerBox": {} })))
        .mount(&server)
        .await;

    let hits = api_for(&server).await.search("nada").await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn hits_without_link_are_kept_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic": [{ "title": "sin enlace" }, { "title": "con", "link": "https://a.example" }]
        })))
        .mount(&server)
        .await;

    let hits = api_for(&server).await.with_max_results(5).search("x").await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].usable_link().is_none());
}

#[tokio::test]
async fn provider_errors_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "Unauthorized." })))
        .mount(&server)
        .await;

    let err = api_for(&server).await.search("x").await.unwrap_err();
    assert!(
        matches!(&err, LookoutError::Search(msg) if msg.contains("Unauthorized.")),
        "{err:?}"
    );
}
