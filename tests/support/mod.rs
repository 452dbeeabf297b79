//! Mock Scholar and document hosts shared by the integration tests.
//!
//! Sandboxes without loopback networking skip the wiremock tests instead of
//! failing them, unless `BIBDL_REQUIRE_SOCKET_TESTS` is set.
#![allow(dead_code)]

use std::net::TcpListener;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REQUIRE_LOOPBACK_ENV: &str = "BIBDL_REQUIRE_SOCKET_TESTS";

fn loopback_required() -> bool {
    std::env::var(REQUIRE_LOOPBACK_ENV)
        .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a mock host, or returns `None` when no loopback socket can be bound.
pub async fn start_mock_host() -> Option<MockServer> {
    match TcpListener::bind("127.0.0.1:0") {
        Ok(_) => Some(MockServer::start().await),
        Err(error) if loopback_required() => {
            panic!("cannot bind a loopback socket for the mock host: {error}; unset {REQUIRE_LOOPBACK_ENV} to skip")
        }
        Err(error) => {
            eprintln!(
                "skipping mock host test: cannot bind a loopback socket ({error}); set {REQUIRE_LOOPBACK_ENV}=1 to fail instead"
            );
            None
        }
    }
}

/// A Scholar result page served for requests carrying `param=value`.
pub fn scholar_page(param: &str, value: &str, html: impl Into<String>) -> Mock {
    Mock::given(method("GET"))
        .and(path("/scholar"))
        .and(query_param(param, value))
        .respond_with(ResponseTemplate::new(200).set_body_string(html.into()))
}

/// Every Scholar request answers with `response`, whatever the query.
pub fn scholar_answers(response: ResponseTemplate) -> Mock {
    Mock::given(method("GET"))
        .and(path("/scholar"))
        .respond_with(response)
}

/// A PDF document served at `path_str`.
pub fn pdf_document(path_str: &str, body: &[u8]) -> Mock {
    Mock::given(method("GET")).and(path(path_str)).respond_with(
        ResponseTemplate::new(200)
            .insert_header("Content-Type", "application/pdf")
            .set_body_bytes(body.to_vec()),
    )
}

/// A one-result Scholar page linking `pdf_url` for `title`.
pub fn single_result_page(title: &str, pdf_url: &str, byline: &str) -> String {
    format!(
        r#"<html><body><div class="gs_r">
  <div class="gs_ggs gs_fl"><a href="{pdf_url}">[PDF] document</a></div>
  <div class="gs_ri">
    <h3 class="gs_rt"><a href="https://example.org/landing">{title}</a></h3>
    <div class="gs_a">{byline}</div>
  </div>
</div></body></html>"#
    )
}
