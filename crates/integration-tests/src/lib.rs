//! End-to-end tests for the SmartStore storefront.
//!
//! The tests drive a running server over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! ss-cli migrate
//! ss-cli seed crates/cli/seed/catalog.yaml
//! SS_STAFF_PASSWORD=... ss-cli staff create -e lan@smartstore.vn -n Lan -r Manager
//! cargo run -p smartstore-storefront &
//!
//! SS_TEST_STAFF_EMAIL=lan@smartstore.vn SS_TEST_STAFF_PASSWORD=... \
//!     cargo test -p smartstore-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `STOREFRONT_BASE_URL` - defaults to `http://localhost:3000`
//! - `SS_TEST_STAFF_EMAIL` / `SS_TEST_STAFF_PASSWORD` - a staff account for
//!   back-office tests

use reqwest::{Client, Response, StatusCode, header::LOCATION, redirect::Policy};
use serde_json::Value;

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A cookie-keeping client that does not follow redirects, so tests can
/// assert on the `303` targets of form posts.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// The `Location` of a redirect response, if any.
#[must_use]
pub fn location(resp: &Response) -> Option<String> {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// GET a JSON view.
///
/// # Panics
///
/// Panics if the request fails or the body is not JSON.
#[allow(clippy::expect_used)]
pub async fn get_json(client: &Client, path: &str) -> (StatusCode, Value) {
    let resp = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("request failed");
    let status = resp.status();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// POST a form and return the response without following redirects.
///
/// # Panics
///
/// Panics if the request fails.
#[allow(clippy::expect_used)]
pub async fn post_form(client: &Client, path: &str, form: &[(&str, &str)]) -> Response {
    client
        .post(format!("{}{path}", base_url()))
        .form(form)
        .send()
        .await
        .expect("request failed")
}

/// A unique suffix for emails and names created by a test run.
#[must_use]
pub fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:x}")
}
