//! Integration tests for `StorefrontClient`.
//!
//! Uses `wiremock` to stand up a local storefront for each test so no real
//! network traffic is made.

use std::time::Duration;

use serde_json::json;
use testresult::TestResult;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

use quiz_cart::{
    backend::{BackendError, CommerceBackend, RemoteLine, StorefrontClient},
    products::{SellingPlanId, VariantId},
};

fn test_client(server: &MockServer) -> Result<StorefrontClient, BackendError> {
    StorefrontClient::new(&server.uri(), Duration::from_secs(5))
}

fn product_json() -> serde_json::Value {
    json!({
        "id": 7,
        "title": "Repair Mask",
        "handle": "repair-mask",
        "tags": ["no consult"],
        "featured_image": "https://cdn.example.com/mask.png",
        "variants": [
            { "id": 701, "title": "Default Title", "price": 2500, "compare_at_price": null, "available": true }
        ],
        "selling_plan_groups": []
    })
}

#[tokio::test]
async fn fetch_product_parses_product_json() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/repair-mask.js"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json()))
        .mount(&server)
        .await;

    let product = test_client(&server)?
        .fetch_product("repair-mask")
        .await
        .ok_or("expected a product")?;

    assert_eq!(product.title(), "Repair Mask");
    assert_eq!(product.first_variant().id, VariantId(701));
    assert!(product.has_tag("no consult"));

    Ok(())
}

#[tokio::test]
async fn fetch_product_encodes_handle_as_one_path_segment() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/mask%2Fsale%3Fv=2%23top.js"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json()))
        .expect(1)
        .mount(&server)
        .await;

    let product = test_client(&server)?
        .fetch_product("mask/sale?v=2#top")
        .await
        .ok_or("expected a product")?;

    assert_eq!(product.handle(), "repair-mask");

    Ok(())
}

#[tokio::test]
async fn fetch_product_returns_none_for_missing_product() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/ghost.js"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(test_client(&server)?.fetch_product("ghost").await.is_none());

    Ok(())
}

#[tokio::test]
async fn fetch_product_returns_none_for_product_without_variants() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/empty.js"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 8,
            "title": "Empty",
            "handle": "empty",
            "variants": []
        })))
        .mount(&server)
        .await;

    assert!(test_client(&server)?.fetch_product("empty").await.is_none());

    Ok(())
}

#[tokio::test]
async fn cart_add_posts_items_with_selling_plan() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cart/add.js"))
        .and(body_json(json!({
            "items": [
                { "id": 701, "quantity": 2 },
                { "id": 702, "quantity": 1, "selling_plan": 9001 }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server)?
        .cart_add(&[
            RemoteLine {
                id: VariantId(701),
                quantity: 2,
                selling_plan: None,
            },
            RemoteLine {
                id: VariantId(702),
                quantity: 1,
                selling_plan: Some(SellingPlanId(9001)),
            },
        ])
        .await?;

    Ok(())
}

#[tokio::test]
async fn cart_add_surfaces_storefront_description() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cart/add.js"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "status": 422,
            "message": "Cart Error",
            "description": "Repair Mask is sold out."
        })))
        .mount(&server)
        .await;

    let result = test_client(&server)?
        .cart_add(&[RemoteLine {
            id: VariantId(701),
            quantity: 1,
            selling_plan: None,
        }])
        .await;

    match result {
        Err(BackendError::Rejected { status, message }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "Repair Mask is sold out.");
        }
        other => return Err(format!("expected Rejected, got {other:?}").into()),
    }

    Ok(())
}

#[tokio::test]
async fn cart_clear_rejects_plain_text_errors() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cart/clear.js"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let result = test_client(&server)?.cart_clear().await;

    assert!(
        matches!(&result, Err(BackendError::Rejected { status: 500, message }) if message == "upstream down"),
        "unexpected result: {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn cart_get_current_reads_snapshot() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cart.js"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "abc123",
            "note": null,
            "item_count": 3,
            "items": [
                { "id": 701, "variant_id": 701, "quantity": 3, "title": "Repair Mask" }
            ]
        })))
        .mount(&server)
        .await;

    let snapshot = test_client(&server)?.cart_get_current().await?;

    assert_eq!(snapshot.token.as_deref(), Some("abc123"));
    assert_eq!(snapshot.item_count, 3);
    assert_eq!(snapshot.items.first().map(|item| item.variant_id), Some(VariantId(701)));

    Ok(())
}

#[tokio::test]
async fn cart_set_note_posts_note() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cart/update.js"))
        .and(body_json(json!({ "note": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server)?.cart_set_note("hello").await?;

    Ok(())
}
