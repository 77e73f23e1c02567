#![allow(clippy::unwrap_used)]
// Integration tests for `BackendClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use s3view_api::{BackendClient, Error, FileList};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, BackendClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/viewer", server.uri())).unwrap();
    let client = BackendClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Summaries ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_all_image_summaries_flattens_groups() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/viewer/api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "getAllImageSummaries": {
                    "optical": {
                        "pan": [
                            { "bucket": "b", "key": "a/img1", "name": "img1", "group": "optical", "type": "pan",
                              "lastModified": "2026-03-01T10:00:00Z" }
                        ],
                        "rgb": [
                            { "bucket": "b", "key": "a/img2", "name": "img2", "group": "optical", "type": "rgb",
                              "lastModified": "2026-03-02T10:00:00Z" }
                        ]
                    },
                    "radar": {
                        "sar": [
                            { "bucket": "r", "key": "x/img3", "name": "img3", "group": "radar", "type": "sar",
                              "lastModified": "2026-03-03T10:00:00Z",
                              "dynamicFilters": { "satellite": "S1" } }
                        ]
                    }
                }
            }
        })))
        .mount(&server)
        .await;

    let summaries = client.all_image_summaries(None).await.unwrap();
    let keys: Vec<&str> = summaries.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["a/img1", "a/img2", "x/img3"]);
    assert_eq!(summaries[2].dynamic_filters["satellite"], "S1");
}

#[tokio::test]
async fn test_all_image_summaries_null_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/viewer/api/graphql"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "getAllImageSummaries": null } })),
        )
        .mount(&server)
        .await;

    assert!(client.all_image_summaries(None).await.unwrap().is_empty());
}

// ── Image detail ────────────────────────────────────────────────────

#[tokio::test]
async fn test_image_sends_variables_and_decodes() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/viewer/api/graphql"))
        .and(body_partial_json(json!({
            "variables": { "bucket": "b", "name": "a/img1" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "getImage": {
                    "imageSummary": {
                        "bucket": "b", "key": "a/img1", "name": "img1",
                        "group": "optical", "type": "pan",
                        "cachedObject": { "lastModified": "2026-03-01T10:00:00Z", "cacheKey": "b/a/img1/preview.jpg" }
                    },
                    "features": { "class": "ship", "count": 3, "objects": { "tanker": 2, "cargo": 1 } },
                    "additionalFiles": { "meta.xml": "b/a/img1/meta.xml" },
                    "targetFiles": ["b/a/img1/target.kml"],
                    "fullProductFiles": { "product.zip": "https://cdn.example.com/product.zip" }
                }
            }
        })))
        .mount(&server)
        .await;

    let image = client.image("b", "a/img1").await.unwrap();
    assert_eq!(image.image_summary.name, "img1");
    assert_eq!(image.features.as_ref().unwrap().count, 3);
    assert!(matches!(image.target_files, FileList::List(ref l) if l.len() == 1));
    assert_eq!(
        image.full_product_files["product.zip"],
        "https://cdn.example.com/product.zip"
    );
}

#[tokio::test]
async fn test_image_null_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/viewer/api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "getImage": null } })))
        .mount(&server)
        .await;

    let result = client.image("b", "missing").await;
    assert!(
        matches!(result, Err(Error::NotFound { ref name, .. }) if name == "missing"),
        "expected NotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn test_graphql_errors_are_surfaced() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/viewer/api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "invalid time range" }]
        })))
        .mount(&server)
        .await;

    let result = client.all_image_summaries(None).await;
    match result {
        Err(Error::GraphQl { messages }) => assert_eq!(messages, vec!["invalid time range"]),
        other => panic!("expected GraphQl error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_http_error_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/viewer/api/graphql"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client.image("b", "k").await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 502, .. }), "got: {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_undecodable_body_keeps_raw_text() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/viewer/api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    match client.image("b", "k").await {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

// ── Static info ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_static_info() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/viewer/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "softwareVersion": "2.4.0",
            "applicationTitle": "Image Viewer",
            "maxImagesDisplayCount": 500,
            "tileServerURL": "https://tiles.example.com/{z}/{x}/{y}.png",
            "imageGroups": [
                { "name": "optical", "bucket": "b", "types": [ { "name": "pan", "displayName": "Panchromatic" } ] }
            ]
        })))
        .mount(&server)
        .await;

    let info = client.static_info().await.unwrap();
    assert_eq!(info.software_version, "2.4.0");
    assert_eq!(info.max_images_display_count, 500);
    assert_eq!(info.image_groups[0].types[0].display_name, "Panchromatic");
}
