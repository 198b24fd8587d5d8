use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};
use stockroom_auth::{JwtClaims, PrincipalId, Role};
use stockroom_core::TenantId;

const SECRET: &str = "black-box-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as the binary, in-memory store, ephemeral port.
        let app = stockroom_api::app::build_app(SECRET);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(tenant_id: TenantId, roles: &[&'static str]) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: PrincipalId::new(),
        tenant_id,
        roles: roles.iter().map(|r| Role::new(*r)).collect(),
        issued_at: now - ChronoDuration::minutes(1),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn id(v: &Value) -> String {
    v["id"].as_str().expect("id field").to_string()
}

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", server.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let server = TestServer::spawn().await;

    let res = server
        .client
        .get(format!("{}/catalog/items", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = server.get("not-a-jwt", "/catalog/items").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let tenant = TenantId::new();
    let (status, body) = server.get(&mint_jwt(tenant, &["viewer"]), "/whoami").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant_id"], tenant.to_string());
}

#[tokio::test]
async fn roles_gate_mutations() {
    let server = TestServer::spawn().await;
    let viewer = mint_jwt(TenantId::new(), &["viewer"]);

    let (status, body) = server
        .post(
            &viewer,
            "/catalog/items",
            json!({ "sku": "X-1", "name": "X", "cost_price": "1.00", "selling_price": "2.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = server.get(&viewer, "/catalog/items").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get(&viewer, "/reports/low-stock").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let server = TestServer::spawn().await;
    let token = mint_jwt(TenantId::new(), &["admin"]);
    let (status, body) = server.get(&token, "/catalog/items/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn receive_transfer_and_sell_over_http() {
    let server = TestServer::spawn().await;
    let tenant = TenantId::new();
    let admin = mint_jwt(tenant, &["admin"]);

    let (status, item) = server
        .post(
            &admin,
            "/catalog/items",
            json!({
                "sku": "WID-1",
                "name": "Widget",
                "cost_price": "4.00",
                "selling_price": "10.00",
                "min_stock_level": 2
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{item}");
    let item_id = id(&item);

    let (_, warehouse) = server
        .post(
            &admin,
            "/catalog/locations",
            json!({ "name": "Main", "location_type": "WAREHOUSE" }),
        )
        .await;
    let (_, shop) = server
        .post(
            &admin,
            "/catalog/locations",
            json!({ "name": "High Street", "location_type": "SHOP" }),
        )
        .await;
    let (warehouse_id, shop_id) = (id(&warehouse), id(&shop));

    let (status, supplier) = server
        .post(&admin, "/parties/suppliers", json!({ "name": "Acme Supply" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, order) = server
        .post(
            &admin,
            "/purchasing/orders",
            json!({
                "supplier_id": id(&supplier),
                "location_id": warehouse_id,
                "lines": [{ "item_id": item_id, "quantity": 10, "unit_cost": "4.00" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    let order_id = id(&order);
    let line_id = order["lines"][0]["id"].as_str().unwrap().to_string();

    let (status, submitted) = server
        .post(&admin, &format!("/purchasing/orders/{order_id}/submit"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "SUBMITTED");

    let receipt_body = |qty: i64| {
        json!({
            "location_id": warehouse_id,
            "lines": [{
                "purchase_order_line_id": line_id,
                "item_id": item_id,
                "received_quantity": qty
            }]
        })
    };
    let (status, outcome) = server
        .post(&admin, &format!("/purchasing/orders/{order_id}/receipts"), receipt_body(6))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{outcome}");
    assert_eq!(outcome["order"]["status"], "PARTIALLY_RECEIVED");

    // 6 of 10 received; 5 more would exceed the ordered quantity.
    let (status, body) = server
        .post(&admin, &format!("/purchasing/orders/{order_id}/receipts"), receipt_body(5))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["error"], "over_receipt");

    let (status, outcome) = server
        .post(&admin, &format!("/purchasing/orders/{order_id}/receipts"), receipt_body(4))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{outcome}");
    assert_eq!(outcome["order"]["status"], "RECEIVED");

    // A fully received order no longer accepts receipts.
    let (status, body) = server
        .post(&admin, &format!("/purchasing/orders/{order_id}/receipts"), receipt_body(1))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "validation_error");

    let transfer = |qty: i64| {
        json!({
            "from_location_id": warehouse_id,
            "to_location_id": shop_id,
            "lines": [{ "item_id": item_id, "quantity": qty }]
        })
    };
    let (status, body) = server.post(&admin, "/inventory/transfers", transfer(4)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = server.post(&admin, "/inventory/transfers", transfer(100)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_stock");

    let (_, available) = server
        .get(&admin, &format!("/inventory/available/{item_id}/{warehouse_id}"))
        .await;
    assert_eq!(available["available"], 6);
    let (_, available) = server
        .get(&admin, &format!("/inventory/available/{item_id}/{shop_id}"))
        .await;
    assert_eq!(available["available"], 4);

    let cashier = mint_jwt(tenant, &["cashier"]);
    let (status, sale) = server
        .post(
            &cashier,
            "/sales/pos/checkout",
            json!({
                "location_id": shop_id,
                "lines": [{ "item_id": item_id, "quantity": 3, "unit_price": "10.00" }],
                "payment_method": "CASH"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    assert!(sale["order_number"].as_str().unwrap().starts_with("POS-"));

    let (_, on_hand) = server
        .get(&admin, &format!("/inventory/on-hand/{item_id}"))
        .await;
    assert_eq!(on_hand["on_hand"], 7);

    let (status, movements) = server
        .get(&admin, &format!("/inventory/movements?item_id={item_id}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(movements.as_array().unwrap().len(), 5);

    // Another tenant sees none of it.
    let other = mint_jwt(TenantId::new(), &["admin"]);
    let (status, _) = server.get(&other, &format!("/catalog/items/{item_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
