use std::time::Duration;

use keepsake_engine::{FetchError, FetchSettings, Fetcher, ReqwestFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fetcher_returns_payload_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(&FetchSettings::default()).expect("client");
    let url = format!("{}/media/1", server.uri());

    let bytes = fetcher.fetch(&url).await.expect("fetch ok");
    assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]);
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/expired"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(&FetchSettings::default()).expect("client");
    let url = format!("{}/expired", server.uri());

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert_eq!(err, FetchError::HttpStatus(410));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(&settings).expect("client");
    let url = format!("{}/slow", server.uri());

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn fetcher_rejects_invalid_urls() {
    let fetcher = ReqwestFetcher::new(&FetchSettings::default()).expect("client");

    let err = fetcher.fetch("not a url at all").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl(_)), "got {err:?}");
}
