//! In-process router tests over the memory store.
//!
//! Each test builds a fresh app with its own store, session store and rate
//! limiters, and drives it with `oneshot` while carrying the session cookie
//! between requests like a browser would.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::net::IpAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use smartstore_core::account::ContactDetails;
use smartstore_core::catalog::ProductInput;
use smartstore_core::store::{AccountStore, CatalogStore, MemoryStore, OrderStore};
use smartstore_core::{OrderStatus, Price, ProductId};
use smartstore_storefront::config::StorefrontConfig;
use smartstore_storefront::middleware::session_layer;
use smartstore_storefront::routes;
use smartstore_storefront::services::auth::hash_password;
use smartstore_storefront::state::AppState;

const PASSWORD: &str = "mat-khau-123";

fn config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/unused".to_string()),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("k8Jd92hQ0zLx7vPq3mN5tR1wY6uB4eC0".to_string()),
        page_size: 12,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

struct Reply {
    status: StatusCode,
    location: Option<String>,
    body: Value,
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    cookie: Option<String>,
    phone: ProductId,
    case: ProductId,
}

impl TestApp {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let iphone = store.create_category("iPhone").await.unwrap();
        let accessories = store.create_category("Phụ kiện").await.unwrap();
        let phone = store
            .create_product(&ProductInput {
                name: "iPhone 15".to_string(),
                base_price: Some(Price::from_dong(22_000_000)),
                sale_price: Some(Price::from_dong(20_000_000)),
                stock: 5,
                category_id: iphone.id,
                description: None,
                image: Some("iphone15.jpg".to_string()),
            })
            .await
            .unwrap();
        let case = store
            .create_product(&ProductInput {
                name: "Ốp lưng MagSafe".to_string(),
                base_price: None,
                sale_price: Some(Price::from_dong(500_000)),
                stock: 10,
                category_id: accessories.id,
                description: None,
                image: None,
            })
            .await
            .unwrap();

        let hash = hash_password(PASSWORD).unwrap();
        let manager = store.ensure_role("Manager").await.unwrap();
        let sales = store.ensure_role("Sales").await.unwrap();
        store
            .create_staff(
                &ContactDetails::parse("Lan", None, "lan@smartstore.vn").unwrap(),
                manager.id,
                &hash,
            )
            .await
            .unwrap();
        store
            .create_staff(
                &ContactDetails::parse("Hùng", None, "hung@smartstore.vn").unwrap(),
                sales.id,
                &hash,
            )
            .await
            .unwrap();
        store
            .create_customer(
                &ContactDetails::parse("Minh", Some("0900000000"), "minh@example.vn").unwrap(),
                &hash,
            )
            .await
            .unwrap();

        let state = AppState::new(config(), store.clone());
        let sessions = session_layer(tower_sessions::MemoryStore::default(), false);

        Self {
            router: routes::app(state, sessions),
            store,
            cookie: None,
            phone: phone.id,
            case: case.id,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        Reply {
            status,
            location,
            body,
        }
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn get(&mut self, uri: &str) -> Reply {
        let request = self.request("GET", uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> Reply {
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn login(&mut self, email: &str) -> Reply {
        self.post("/auth/login", &format!("email={email}&password={PASSWORD}"))
            .await
    }
}

fn assert_redirect(reply: &Reply, to: &str) {
    assert_eq!(reply.status, StatusCode::SEE_OTHER, "body: {}", reply.body);
    assert_eq!(reply.location.as_deref(), Some(to));
}

#[tokio::test]
async fn test_health() {
    let mut app = TestApp::new().await;
    let reply = app.get("/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, Value::String("ok".to_string()));

    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_catalog_listing_and_detail() {
    let mut app = TestApp::new().await;

    let reply = app.get("/products?sort=price_asc&page=0").await;
    assert_eq!(reply.status, StatusCode::OK);
    let page = &reply.body["data"];
    assert_eq!(page["total_items"], 2);
    assert_eq!(page["page"], 1);
    assert_eq!(page["items"][0]["name"], "Ốp lưng MagSafe");

    let reply = app.get(&format!("/products/{}", app.phone)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["product"]["name"], "iPhone 15");
    assert_eq!(reply.body["data"]["options"]["storages"][0], "128GB");

    assert_eq!(app.get("/products/999").await.status, StatusCode::NOT_FOUND);

    let reply = app.get("/categories").await;
    assert_eq!(reply.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cart_merges_lines_by_selection() {
    let mut app = TestApp::new().await;
    let phone = app.phone;

    let form = |qty: i32, color: &str| {
        format!("product_id={phone}&quantity={qty}&color={color}&variant=128GB")
    };
    assert_redirect(&app.post("/cart/add", &form(1, "Black")).await, "/cart");
    assert_redirect(&app.post("/cart/add", &form(2, "Black")).await, "/cart");
    assert_redirect(&app.post("/cart/add", &form(1, "White")).await, "/cart");

    let reply = app.get("/cart").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["flash"]["kind"], "success");
    let lines = reply.body["data"]["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["quantity"], 3);
    assert_eq!(lines[0]["color"], "Black");
    assert_eq!(lines[1]["color"], "White");
    assert_eq!(reply.body["data"]["count"], 4);

    // The flash is shown once
    let reply = app.get("/cart").await;
    assert!(reply.body.get("flash").is_none());

    let reply = app.get("/cart/count").await;
    assert_eq!(reply.body["count"], 4);
}

#[tokio::test]
async fn test_cart_rejects_bad_input_with_flash() {
    let mut app = TestApp::new().await;

    let reply = app.post("/cart/add", "product_id=999").await;
    assert_redirect(&reply, "/cart");
    let reply = app.get("/cart").await;
    assert_eq!(reply.body["flash"]["kind"], "error");
    assert_eq!(reply.body["data"]["count"], 0);

    let form = format!("product_id={}&quantity=0", app.phone);
    assert_redirect(&app.post("/cart/add", &form).await, "/cart");
    let reply = app.get("/cart").await;
    assert_eq!(reply.body["flash"]["kind"], "error");
}

#[tokio::test]
async fn test_cart_caps_line_quantity() {
    let mut app = TestApp::new().await;
    let phone = app.phone;
    let add = |qty: i64, color: &str| format!("product_id={phone}&quantity={qty}&color={color}");

    assert_redirect(&app.post("/cart/add", &add(2_147_483_647, "Black")).await, "/cart");
    let reply = app.get("/cart").await;
    assert_eq!(reply.body["flash"]["kind"], "error");
    assert_eq!(reply.body["data"]["count"], 0);

    app.post("/cart/add", &add(32_767, "Black")).await;
    assert_redirect(&app.post("/cart/add", &add(1, "Black")).await, "/cart");
    let reply = app.get("/cart").await;
    assert_eq!(reply.body["flash"]["kind"], "error");

    app.post("/cart/add", &add(1, "White")).await;
    let update = format!("product_id={phone}&quantity=2147483647");
    assert_redirect(&app.post("/cart/update", &update).await, "/cart");

    // Every cart view still renders
    let reply = app.get("/cart").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["flash"]["kind"], "error");
    assert_eq!(reply.body["data"]["count"], 32_768);
    assert_eq!(app.get("/cart/count").await.body["count"], 32_768);
}

#[tokio::test]
async fn test_checkout_rejects_total_too_large() {
    let mut app = TestApp::new().await;
    let category = app.store.get_product(app.phone).await.unwrap().unwrap().category_id;
    let vertu = app
        .store
        .create_product(&ProductInput {
            name: "Vertu Signature".to_string(),
            base_price: None,
            sale_price: Some(Price::MAX),
            stock: 3,
            category_id: category,
            description: None,
            image: None,
        })
        .await
        .unwrap();

    app.login("minh@example.vn").await;
    app.post("/cart/add", &format!("product_id={}&quantity=2", vertu.id))
        .await;
    let reply = app
        .post("/checkout", "recipient_name=Minh&address=12+Le+Loi")
        .await;
    assert_redirect(&reply, "/checkout");

    let reply = app.get("/checkout").await;
    assert_eq!(reply.body["flash"]["kind"], "error");
    assert_eq!(reply.body["data"]["cart"]["count"], 2);
    assert!(app.store.list_orders(None).await.unwrap().is_empty());
    let vertu = app.store.get_product(vertu.id).await.unwrap().unwrap();
    assert_eq!((vertu.stock, vertu.purchase_count), (3, 0));
}

#[tokio::test]
async fn test_cart_update_and_remove() {
    let mut app = TestApp::new().await;
    let (phone, case) = (app.phone, app.case);

    app.post(
        "/cart/add",
        &format!("product_id={phone}&color=Black&variant=256GB"),
    )
    .await;
    app.post("/cart/add", &format!("product_id={case}&quantity=2"))
        .await;

    // Blank selection keeps the line's color and variant
    app.post(
        "/cart/update",
        &format!("product_id={phone}&quantity=4&color=&variant="),
    )
    .await;
    let reply = app.get("/cart").await;
    let lines = reply.body["data"]["lines"].as_array().unwrap();
    assert_eq!(lines[0]["quantity"], 4);
    assert_eq!(lines[0]["color"], "Black");
    assert_eq!(lines[0]["variant"], "256GB");

    app.post("/cart/remove", &format!("product_id={phone}")).await;
    let reply = app.get("/cart").await;
    let lines = reply.body["data"]["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["product"]["id"], case.as_i32());

    assert_redirect(&app.post("/cart/clear", "").await, "/cart");
    assert_eq!(app.get("/cart/count").await.body["count"], 0);
}

#[tokio::test]
async fn test_checkout_requires_customer() {
    let mut app = TestApp::new().await;
    assert_redirect(&app.get("/checkout").await, "/auth/login");
    assert_redirect(
        &app.post("/checkout", "recipient_name=A&address=B").await,
        "/auth/login",
    );
}

#[tokio::test]
async fn test_buy_now_requires_customer() {
    let mut app = TestApp::new().await;
    let uri = format!("/cart/buy-now/{}", app.phone);
    assert_redirect(&app.post(&uri, "").await, "/auth/login");
    assert_eq!(app.get("/cart/count").await.body["count"], 0);

    app.login("minh@example.vn").await;
    assert_redirect(&app.post(&uri, "").await, "/checkout");
    assert_redirect(&app.post(&uri, "").await, "/checkout");
    let reply = app.get("/cart").await;
    assert_eq!(reply.body["data"]["lines"].as_array().unwrap().len(), 1);
    assert_eq!(reply.body["data"]["count"], 2);
}

#[tokio::test]
async fn test_checkout_places_order_and_reconciles_stock() {
    let mut app = TestApp::new().await;
    let phone = app.phone;

    app.post("/cart/add", &format!("product_id={phone}&quantity=2&color=Black"))
        .await;
    assert_redirect(&app.login("minh@example.vn").await, "/");

    // The cart survives login
    let reply = app.get("/checkout").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["cart"]["count"], 2);
    assert_eq!(reply.body["data"]["recipient_phone"], "0900000000");

    let reply = app
        .post(
            "/checkout",
            "recipient_name=Minh&recipient_phone=0900000000&address=12+Le+Loi",
        )
        .await;
    assert_redirect(&reply, "/account/orders/1");

    let product = app.store.get_product(phone).await.unwrap().unwrap();
    assert_eq!(product.stock, 3);
    assert_eq!(product.purchase_count, 2);
    assert_eq!(app.get("/cart/count").await.body["count"], 0);

    let reply = app.get("/account/orders/1").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["flash"]["message"], "Order #1 placed");
    assert_eq!(reply.body["data"]["order"]["status"], "pending");
    assert_eq!(reply.body["data"]["lines"][0]["quantity"], 2);

    let reply = app.get("/account/orders?status=0").await;
    assert_eq!(reply.body["data"].as_array().unwrap().len(), 1);
    let reply = app.get("/account/orders?status=3").await;
    assert!(reply.body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_empty_cart_and_blank_address() {
    let mut app = TestApp::new().await;
    app.login("minh@example.vn").await;

    let reply = app.post("/checkout", "recipient_name=Minh&address=12+Le+Loi").await;
    assert_redirect(&reply, "/cart");
    let reply = app.get("/cart").await;
    assert_eq!(reply.body["flash"]["message"], "Your cart is empty");

    let case = app.case;
    app.post("/cart/add", &format!("product_id={case}")).await;
    let reply = app.post("/checkout", "recipient_name=Minh&address=+++").await;
    assert_redirect(&reply, "/checkout");

    assert!(app.store.list_orders(None).await.unwrap().is_empty());
    assert_eq!(app.get("/cart/count").await.body["count"], 1);
    let product = app.store.get_product(case).await.unwrap().unwrap();
    assert_eq!(product.stock, 10);
}

#[tokio::test]
async fn test_login_failure_and_logout_keeps_cart() {
    let mut app = TestApp::new().await;

    let reply = app
        .post("/auth/login", "email=minh@example.vn&password=wrong")
        .await;
    assert_redirect(&reply, "/auth/login");
    let reply = app.get("/auth/login").await;
    assert_eq!(reply.body["flash"]["message"], "Invalid email or password");

    app.login("minh@example.vn").await;
    app.post("/cart/add", &format!("product_id={}", app.case)).await;
    assert_redirect(&app.post("/auth/logout", "").await, "/");

    assert_eq!(app.get("/cart/count").await.body["count"], 1);
    assert_redirect(&app.get("/account/profile").await, "/auth/login");
}

#[tokio::test]
async fn test_register_and_profile_update() {
    let mut app = TestApp::new().await;

    let reply = app
        .post(
            "/auth/register",
            "name=Linh&email=Linh@Example.vn&password=abc&password_confirm=abc",
        )
        .await;
    assert_redirect(&reply, "/");

    let reply = app.get("/account/profile").await;
    assert_eq!(reply.body["data"]["email"], "linh@example.vn");
    assert!(reply.body["data"].get("password_hash").is_none());

    let reply = app
        .post(
            "/account/profile",
            "name=Linh+Nguyen&phone=0911&email=linh@example.vn&new_password=x&password_confirm=y",
        )
        .await;
    assert_redirect(&reply, "/account/profile");
    let reply = app.get("/account/profile").await;
    assert_eq!(reply.body["flash"]["kind"], "error");
    assert_eq!(reply.body["data"]["name"], "Linh");

    app.post(
        "/account/profile",
        "name=Linh+Nguyen&phone=0911&email=linh@example.vn",
    )
    .await;
    let reply = app.get("/account/profile").await;
    assert_eq!(reply.body["data"]["name"], "Linh Nguyen");

    // Duplicate email is refused
    app.post("/auth/logout", "").await;
    let reply = app
        .post("/auth/register", "name=Other&email=minh@example.vn&password=abc")
        .await;
    assert_redirect(&reply, "/auth/register");
}

#[tokio::test]
async fn test_staff_order_lifecycle() {
    let mut app = TestApp::new().await;
    let phone = app.phone;

    app.login("minh@example.vn").await;
    app.post("/cart/add", &format!("product_id={phone}&quantity=2"))
        .await;
    app.post("/checkout", "recipient_name=Minh&address=12+Le+Loi")
        .await;
    app.post("/auth/logout", "").await;

    // Customers cannot reach the back-office
    assert_redirect(&app.get("/admin/orders").await, "/auth/login");

    assert_redirect(&app.login("hung@smartstore.vn").await, "/admin/orders");
    let reply = app.get("/admin/orders?status=pending").await;
    assert_eq!(reply.body["data"][0]["customer_name"], "Minh");

    assert_redirect(&app.post("/admin/orders/1/approve", "").await, "/admin/orders/1");
    let reply = app.get("/admin/orders/1").await;
    assert_eq!(reply.body["data"]["order"]["status"], "approved");
    assert_eq!(reply.body["data"]["approver_name"], "Hùng");

    app.post("/admin/orders/1/cancel", "").await;
    app.post("/admin/orders/1/cancel", "").await;
    let product = app.store.get_product(phone).await.unwrap().unwrap();
    assert_eq!((product.stock, product.purchase_count), (5, 0));

    // Completing a cancelled order is refused with a flash
    assert_redirect(&app.post("/admin/orders/1/complete", "").await, "/admin/orders/1");
    let reply = app.get("/admin/orders/1").await;
    assert_eq!(reply.body["flash"]["kind"], "error");
    assert_eq!(reply.body["data"]["order"]["status"], "cancelled");
    assert_eq!(
        app.store.get_order(1.into()).await.unwrap().unwrap().order.status,
        OrderStatus::Cancelled
    );
}

#[tokio::test]
async fn test_manager_routes_require_manager() {
    let mut app = TestApp::new().await;

    app.login("hung@smartstore.vn").await;
    assert_eq!(app.get("/admin/staff").await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/admin/customers").await.status, StatusCode::FORBIDDEN);
    let reply = app.get("/admin/me").await;
    assert_eq!(reply.body["data"]["role"]["name"], "Sales");

    app.post("/auth/logout", "").await;
    app.login("lan@smartstore.vn").await;
    let reply = app.get("/admin/staff").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["staff"].as_array().unwrap().len(), 2);

    let reply = app.get("/admin/customers").await;
    assert_eq!(reply.body["data"][0]["order_count"], 0);
}

#[tokio::test]
async fn test_category_delete_in_use_is_flashed() {
    let mut app = TestApp::new().await;
    app.login("hung@smartstore.vn").await;

    assert_redirect(
        &app.post("/admin/categories/1/delete", "").await,
        "/admin/categories",
    );
    let reply = app.get("/admin/categories").await;
    assert_eq!(reply.body["flash"]["kind"], "error");
    assert_eq!(reply.body["data"].as_array().unwrap().len(), 2);

    app.post("/admin/categories", "name=Tablet").await;
    let reply = app.get("/categories").await;
    assert_eq!(reply.body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_admin_product_create_and_update() {
    let mut app = TestApp::new().await;
    app.login("hung@smartstore.vn").await;

    let reply = app
        .post(
            "/admin/products",
            "name=Galaxy+S24&sale_price=19990000&stock=4&category_id=1&ram=8GB",
        )
        .await;
    assert_redirect(&reply, "/admin/products/3");

    let reply = app.get("/admin/products/3").await;
    assert_eq!(reply.body["data"]["product"]["stock"], 4);
    assert_eq!(reply.body["data"]["specs"]["ram"], "8GB");

    let reply = app
        .post("/admin/products/3", "name=Galaxy+S24&stock=-1&category_id=1")
        .await;
    assert_redirect(&reply, "/admin/products/3");
    let reply = app.get("/admin/products/3").await;
    assert_eq!(reply.body["flash"]["kind"], "error");
    assert_eq!(reply.body["data"]["product"]["stock"], 4);
}
