mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{TEST_PASSWORD, TestContext};
use http_body_util::BodyExt;
use order_service::models::OrderStatus;
use order_service::services::CartItem;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(
    ctx: &TestContext,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = ctx.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn health_is_public() {
    let ctx = TestContext::new().await;

    let (status, body) = send(&ctx, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&ctx, "GET", "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn protected_route_requires_token() {
    let ctx = TestContext::new().await;

    let (status, body) = send(&ctx, "GET", "/invoice/self", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&ctx, "GET", "/invoice/self", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn archived_user_is_unauthenticated() {
    let ctx = TestContext::new().await;
    let role = ctx.store_role("user").await;
    let mut user = common::user("gone@example.com", vec![role]);
    user.archived = true;
    ctx.store.put_user(user.clone()).await;
    let token = ctx
        .state
        .jwt
        .generate_access_token(&user.id, &user.email)
        .unwrap();

    let (status, _) = send(&ctx, "GET", "/user/self", Some(&token), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_role_cannot_list_all_invoices() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.user_with_role("customer@example.com", "user").await;

    let (status, body) = send(&ctx, "GET", "/invoice", Some(&token), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("permission"));
}

#[tokio::test]
async fn admin_role_reaches_every_route() {
    let ctx = TestContext::new().await;
    let (_, admin) = ctx.user_with_role("admin@example.com", "admin").await;

    let (status, body) = send(&ctx, "GET", "/invoice?start=0&quantity=5", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(&ctx, "GET", "/stats/earnings", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn permissions_match_route_templates() {
    let ctx = TestContext::new().await;
    let (user, token) = ctx.user_with_role("customer@example.com", "user").await;
    let invoice = ctx
        .ledger()
        .create(&user.id, &[CartItem::new("p1", 2)])
        .await
        .unwrap();

    let uri = format!("/invoice/self/{}", invoice.id);
    let (status, body) = send(&ctx, "GET", &uri, Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], invoice.id);
    assert_eq!(body["order"]["products"][0]["product"]["name"], "Product p1");
}

#[tokio::test]
async fn user_cannot_archive_other_users_invoice() {
    let ctx = TestContext::new().await;
    let (owner, _) = ctx.user_with_role("owner@example.com", "user").await;
    let (_, intruder) = ctx.user_with_role("intruder@example.com", "user").await;
    let (_, admin) = ctx.user_with_role("admin@example.com", "admin").await;
    let invoice = ctx
        .ledger()
        .create(&owner.id, &[CartItem::new("p1", 1)])
        .await
        .unwrap();
    let uri = format!("/invoice/{}", invoice.id);

    let (status, _) = send(&ctx, "DELETE", &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Own-invoice route is scoped to the caller, so another user's id is unknown.
    let own_uri = format!("/invoice/self/{}", invoice.id);
    let (status, _) = send(&ctx, "DELETE", &own_uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&ctx, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(ctx.store.invoices_of(&owner.id).await[0].archived);
}

#[tokio::test]
async fn register_then_login() {
    let ctx = TestContext::new().await;
    let registration = json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "Ada@Example.com",
        "password": TEST_PASSWORD,
    });

    let (status, profile) = send(&ctx, "POST", "/user", None, Some(registration.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile["email"], "ada@example.com");
    assert_eq!(profile["roles"][0]["name"], "user");
    assert!(profile.get("password").is_none());

    let (status, _) = send(&ctx, "POST", "/user", None, Some(registration)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &ctx,
        "POST",
        "/user/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, body) = send(
        &ctx,
        "POST",
        "/user/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokenType"], "Bearer");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = send(&ctx, "GET", "/user/self", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["firstName"], "Ada");
}

#[tokio::test]
async fn register_rejects_invalid_input() {
    let ctx = TestContext::new().await;

    let (status, body) = send(
        &ctx,
        "POST",
        "/user",
        None,
        Some(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "not-an-email",
            "password": "short",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test]
async fn admin_assigns_role_snapshots() {
    let ctx = TestContext::new().await;
    let (user, user_token) = ctx.user_with_role("customer@example.com", "user").await;
    let (_, admin) = ctx.user_with_role("admin@example.com", "admin").await;
    let uri = format!("/user/{}/roles", user.id);

    let (status, _) = send(
        &ctx,
        "PUT",
        &uri,
        Some(&user_token),
        Some(json!({ "roles": ["admin"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&ctx, "PUT", &uri, Some(&admin), Some(json!({ "roles": ["root"] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &ctx,
        "PUT",
        &uri,
        Some(&admin),
        Some(json!({ "roles": ["user", "admin"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"].as_array().unwrap().len(), 2);

    let (status, _) = send(&ctx, "GET", "/invoice", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn checkout_flow_over_http() {
    let ctx = TestContext::new().await;
    let (user, token) = ctx.user_with_role("customer@example.com", "user").await;

    let (status, body) = send(
        &ctx,
        "POST",
        "/payment/create",
        Some(&token),
        Some(json!({ "cart": [{ "productId": "p2", "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Order created successfully");
    let invoice_id = body["invoiceId"].as_str().unwrap().to_string();

    ctx.gateway.set_amount("PAY-WRONG", 21.50);
    let (status, body) = send(
        &ctx,
        "POST",
        "/payment/capture",
        Some(&token),
        Some(json!({ "paypalOrderId": "PAY-WRONG" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Amount mismatch: expected 19.99, received 21.50");
    assert_eq!(body["details"]["expected"], 19.99);
    assert_eq!(body["details"]["received"], 21.5);

    ctx.gateway.set_amount("PAY-RIGHT", 19.99);
    let (status, body) = send(
        &ctx,
        "POST",
        "/payment/capture",
        Some(&token),
        Some(json!({ "paypalOrderId": "PAY-RIGHT" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Order updated successfully");
    assert_eq!(body["invoiceId"], invoice_id);

    let stored = ctx.store.invoices_of(&user.id).await;
    assert_eq!(stored[0].status(), OrderStatus::Paid);

    let (status, history) = send(&ctx, "GET", "/invoice/history/self", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["id"], invoice_id);

    let (status, body) = send(&ctx, "POST", "/invoice/cancel/self", Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("paid"));
}

#[tokio::test]
async fn create_payment_rejects_bad_carts() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.user_with_role("customer@example.com", "user").await;

    let (status, _) = send(
        &ctx,
        "POST",
        "/payment/create",
        Some(&token),
        Some(json!({ "cart": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &ctx,
        "POST",
        "/payment/create",
        Some(&token),
        Some(json!({ "cart": [{ "productId": "p1", "quantity": -1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &ctx,
        "POST",
        "/payment/create",
        Some(&token),
        Some(json!({ "cart": [{ "productId": "nope", "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_use_legacy_keys() {
    let ctx = TestContext::new().await;
    let (user, _) = ctx.user_with_role("customer@example.com", "user").await;
    let (_, admin) = ctx.user_with_role("admin@example.com", "admin").await;

    ctx.ledger()
        .create(&user.id, &[CartItem::new("p1", 2)])
        .await
        .unwrap();
    ctx.gateway.set_amount("PAY-1", 12.00);
    ctx.ledger().capture(&user.id, "PAY-1").await.unwrap();

    let (_, body) = send(&ctx, "GET", "/stats/earnings", Some(&admin), None).await;
    assert_eq!(body["earnings"], 12.0);
    let (_, body) = send(&ctx, "GET", "/stats/commande_total", Some(&admin), None).await;
    assert_eq!(body["total_commande"], 1);
    let (_, body) = send(&ctx, "GET", "/stats/average_spending", Some(&admin), None).await;
    assert_eq!(body["average_spending"], 12.0);
    let (_, body) = send(&ctx, "GET", "/stats/total_product_sold", Some(&admin), None).await;
    assert_eq!(body["total_product_sold"], 2);
}

#[tokio::test]
async fn device_tokens_and_broadcast() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.user_with_role("customer@example.com", "user").await;
    let (_, admin) = ctx.user_with_role("admin@example.com", "admin").await;

    let (status, _) = send(
        &ctx,
        "POST",
        "/push-notification/register-token",
        Some(&token),
        Some(json!({ "token": "device-abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &ctx,
        "POST",
        "/push-notification/notify",
        Some(&token),
        Some(json!({ "title": "Sale", "body": "Now on" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &ctx,
        "POST",
        "/push-notification/notify",
        Some(&admin),
        Some(json!({ "title": "Sale", "body": "Now on" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["recipients"], 1);
}

#[tokio::test]
async fn user_updates_own_profile() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.user_with_role("customer@example.com", "user").await;

    let (status, body) = send(
        &ctx,
        "PUT",
        "/user/self",
        Some(&token),
        Some(json!({ "address": "12 rue de Rivoli", "phoneNumber": "0600000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["address"], "12 rue de Rivoli");
    assert_eq!(body["phoneNumber"], "0600000000");
    assert_eq!(body["firstName"], "Test");

    let (status, _) = send(
        &ctx,
        "PUT",
        "/user/self",
        Some(&token),
        Some(json!({ "firstName": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn user_changes_password() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.user_with_role("customer@example.com", "user").await;

    let (status, body) = send(
        &ctx,
        "PUT",
        "/user/self/password",
        Some(&token),
        Some(json!({ "currentPassword": "not-my-password", "newPassword": "brand-new-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Current password is incorrect");

    let (status, _) = send(
        &ctx,
        "PUT",
        "/user/self/password",
        Some(&token),
        Some(json!({ "currentPassword": TEST_PASSWORD, "newPassword": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &ctx,
        "PUT",
        "/user/self/password",
        Some(&token),
        Some(json!({ "currentPassword": TEST_PASSWORD, "newPassword": "brand-new-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password updated successfully");

    let (status, _) = send(
        &ctx,
        "POST",
        "/user/login",
        None,
        Some(json!({ "email": "customer@example.com", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &ctx,
        "POST",
        "/user/login",
        None,
        Some(json!({ "email": "customer@example.com", "password": "brand-new-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn archived_account_loses_access() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.user_with_role("customer@example.com", "user").await;

    let (status, _) = send(&ctx, "DELETE", "/user/self", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&ctx, "GET", "/user/self", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_manages_users() {
    let ctx = TestContext::new().await;
    let (customer, token) = ctx.user_with_role("customer@example.com", "user").await;
    let (_, admin) = ctx.user_with_role("admin@example.com", "admin").await;
    let customer_uri = format!("/user/{}", customer.id);

    let (status, _) = send(&ctx, "GET", "/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&ctx, "GET", &customer_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&ctx, "GET", "/user", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert!(body[0].get("password").is_none());

    let (status, body) = send(&ctx, "GET", &customer_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "customer@example.com");

    let (status, body) = send(&ctx, "GET", "/stats/user_total", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_user"], 2);

    let (status, _) = send(&ctx, "DELETE", &customer_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&ctx, "GET", "/stats/user_total", Some(&admin), None).await;
    assert_eq!(body["total_user"], 1);
    let (status, _) = send(&ctx, "GET", "/user/self", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&ctx, "GET", "/user/missing", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn paging_rejects_out_of_range_start() {
    let ctx = TestContext::new().await;
    let (_, admin) = ctx.user_with_role("admin@example.com", "admin").await;
    let uri_tail = format!("?start={}&quantity=5", u64::MAX);

    let (status, _) = send(&ctx, "GET", &format!("/invoice{}", uri_tail), Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&ctx, "GET", &format!("/user{}", uri_tail), Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn products_are_listed_and_found_by_barcode() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.user_with_role("customer@example.com", "user").await;
    let mut retired = common::product("p9", 1.00);
    retired.archived = true;
    ctx.store.put_product(retired).await;

    let (status, body) = send(&ctx, "GET", "/product", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Product p1", "Product p2", "Product p3"]);

    let (status, _) = send(&ctx, "GET", "/product?quantity=0", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&ctx, "GET", "/product/barcode/REF-p2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], "p2");
    assert_eq!(body["priceVat"], 19.99);

    let (status, _) = send(&ctx, "GET", "/product/barcode/REF-p9", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&ctx, "GET", "/product/barcode/0000", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product with barcode 0000 not found");
}
