//! Product catalog and payment flows over HTTP.

#![allow(clippy::unwrap_used)]

use orchard_core::{Role, UserId};
use orchard_integration_tests::{
    TestApp, sample_order_body, stub_identity::StubIdentity, token_for,
};

struct Scenario {
    app: TestApp,
    user_id: UserId,
    user_token: String,
    admin_token: String,
}

async fn scenario() -> Scenario {
    let stub = StubIdentity::spawn().await;
    let app = TestApp::spawn(stub.base_url()).await;

    let user_id = UserId::generate();
    let user_token = token_for(&app.secret, user_id, Role::User);
    stub.register_user(user_id, Role::User);
    stub.accept_token(&user_token, user_id, Role::User);

    let admin_id = UserId::generate();
    let admin_token = token_for(&app.secret, admin_id, Role::Admin);
    stub.register_user(admin_id, Role::Admin);
    stub.accept_token(&admin_token, admin_id, Role::Admin);

    Scenario {
        app,
        user_id,
        user_token,
        admin_token,
    }
}

fn product_body(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "description": "A sturdy mug.",
        "price": { "amount": "12.99", "currency_code": "USD" },
    })
}

#[tokio::test]
async fn catalog_reads_are_public_writes_are_admin_only() {
    let s = scenario().await;

    // Non-admin cannot create.
    let response = s
        .app
        .client
        .post(s.app.url("/products"))
        .bearer_auth(&s.user_token)
        .json(&product_body("Mug"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Admin can.
    let response = s
        .app
        .client
        .post(s.app.url("/products"))
        .bearer_auth(&s.admin_token)
        .json(&product_body("Mug"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let product: serde_json::Value = response.json().await.unwrap();

    // Listing requires no token at all.
    let listed: serde_json::Value = s
        .app
        .client
        .get(s.app.url("/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = listed.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], product["id"]);
}

#[tokio::test]
async fn deactivated_products_leave_the_listing() {
    let s = scenario().await;

    let product: serde_json::Value = s
        .app
        .client
        .post(s.app.url("/products"))
        .bearer_auth(&s.admin_token)
        .json(&product_body("Plate"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let product_id = product["id"].as_str().unwrap();

    let response = s
        .app
        .client
        .delete(s.app.url(&format!("/products/{product_id}")))
        .bearer_auth(&s.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let listed: serde_json::Value = s
        .app
        .client
        .get(s.app.url("/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 0);

    // Direct fetch still works for order history.
    let detail: serde_json::Value = s
        .app
        .client
        .get(s.app.url(&format!("/products/{product_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["active"], false);
}

async fn create_order(s: &Scenario) -> String {
    let created: serde_json::Value = s
        .app
        .client
        .post(s.app.url("/orders"))
        .bearer_auth(&s.user_token)
        .json(&sample_order_body(s.user_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    created["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn payment_freezes_order_total() {
    let s = scenario().await;
    let order_id = create_order(&s).await;

    let response = s
        .app
        .client
        .post(s.app.url(&format!("/orders/{order_id}/payments")))
        .bearer_auth(&s.user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let payment: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payment["status"], "pending");
    assert_eq!(payment["amount"]["amount"], "39.98");
}

#[tokio::test]
async fn payment_status_changes_are_admin_only_and_lifecycle_checked() {
    let s = scenario().await;
    let order_id = create_order(&s).await;

    let payment: serde_json::Value = s
        .app
        .client
        .post(s.app.url(&format!("/orders/{order_id}/payments")))
        .bearer_auth(&s.user_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let payment_id = payment["id"].as_str().unwrap();

    // Owner cannot settle their own payment.
    let response = s
        .app
        .client
        .patch(s.app.url(&format!("/payments/{payment_id}/status")))
        .bearer_auth(&s.user_token)
        .json(&serde_json::json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Admin fails the payment; a failed payment cannot be refunded.
    let response = s
        .app
        .client
        .patch(s.app.url(&format!("/payments/{payment_id}/status")))
        .bearer_auth(&s.admin_token)
        .json(&serde_json::json!({ "status": "failed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = s
        .app
        .client
        .patch(s.app.url(&format!("/payments/{payment_id}/status")))
        .bearer_auth(&s.admin_token)
        .json(&serde_json::json!({ "status": "refunded" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_STATUS_TRANSITION");
}
