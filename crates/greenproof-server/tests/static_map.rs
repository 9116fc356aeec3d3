//! StaticMapClient against a mock HTTP endpoint.

mod common;

use std::sync::Arc;
use std::time::Duration;

use greenproof::{CrossCheck, GeoLocation};
use greenproof_server::satellite::{CrossValidator, RetryPolicy, StaticMapClient, TileError, TileProvider};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::tile_png;

const KEY: &str = "test-key";

fn client(server: &MockServer) -> StaticMapClient {
    StaticMapClient::new(format!("{}/maps/api/staticmap", server.uri()), KEY)
}

#[tokio::test]
async fn test_fetch_sends_tile_query() {
    let server = MockServer::start().await;
    let png = tile_png();

    Mock::given(method("GET"))
        .and(path("/maps/api/staticmap"))
        .and(query_param("center", "10.51,-73.96"))
        .and(query_param("zoom", "20"))
        .and(query_param("size", "600x600"))
        .and(query_param("maptype", "satellite"))
        .and(query_param("key", KEY))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png.clone()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tile = client(&server).fetch_tile(10.51, -73.96).await.unwrap();
    assert_eq!(tile, png);
}

#[tokio::test]
async fn test_client_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client(&server).fetch_tile(1.0, 2.0).await.unwrap_err();
    assert_eq!(err, TileError::Status(403));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_empty_success_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client(&server).fetch_tile(1.0, 2.0).await.unwrap_err();
    assert_eq!(err, TileError::EmptyBody);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let unreachable = StaticMapClient::new("http://127.0.0.1:1/staticmap", KEY);
    let err = unreachable.fetch_tile(1.0, 2.0).await.unwrap_err();
    assert!(err.is_retryable(), "{err:?}");
}

#[tokio::test]
async fn test_validator_retries_server_errors() {
    let server = MockServer::start().await;
    let png = tile_png();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let validator = CrossValidator::new(
        Arc::new(client(&server)),
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(5),
            backoff: Duration::from_millis(1),
        },
    );
    let outcome = validator
        .validate(&GeoLocation::Valid { lat: 10.51, lon: -73.96 })
        .await;
    assert_eq!(outcome.cross_check, CrossCheck::attempted(true));
    assert_eq!(outcome.tile, Some(png));
}

#[tokio::test]
async fn test_validator_times_out_slow_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(tile_png())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let validator = CrossValidator::new(
        Arc::new(client(&server)),
        RetryPolicy {
            max_attempts: 1,
            attempt_timeout: Duration::from_millis(50),
            backoff: Duration::from_millis(1),
        },
    );
    let outcome = validator
        .validate(&GeoLocation::Valid { lat: 0.5, lon: 0.5 })
        .await;
    assert_eq!(outcome.cross_check, CrossCheck::attempted(false));
    assert!(outcome.tile.is_none());
}
