use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use telemirror::config::GeocodingConfig;
use telemirror::geocode::{Geocoder, NominatimGeocoder};

fn geocoder(server: &ServerGuard) -> NominatimGeocoder {
    let config = GeocodingConfig {
        enabled: true,
        url: format!("{}/", server.url()),
        user_agent: "telemirror-test".to_string(),
        timeout_secs: 5,
    };
    NominatimGeocoder::new(&config, "nl-nl").unwrap()
}

#[tokio::test]
async fn reverse_returns_display_name() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/reverse".to_string()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("format".into(), "jsonv2".into()),
            Matcher::UrlEncoded("lat".into(), "52.37".into()),
            Matcher::UrlEncoded("lon".into(), "4.89".into()),
        ]))
        .match_header("user-agent", "telemirror-test")
        .match_header("accept-language", "nl-nl")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"display_name": "Dam 1, Amsterdam"}).to_string())
        .create_async()
        .await;

    let address = geocoder(&server).reverse(52.37, 4.89).await;
    assert_eq!(address.as_deref(), Some("Dam 1, Amsterdam"));
    mock.assert_async().await;
}

#[tokio::test]
async fn provider_error_yields_none() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", Matcher::Regex(r"^/reverse".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": "Unable to geocode"}).to_string())
        .create_async()
        .await;

    assert!(geocoder(&server).reverse(0.0, 0.0).await.is_none());
}

#[tokio::test]
async fn http_failure_yields_none() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", Matcher::Regex(r"^/reverse".to_string()))
        .with_status(503)
        .create_async()
        .await;

    assert!(geocoder(&server).reverse(1.0, 2.0).await.is_none());
}
