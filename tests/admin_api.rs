//! Admin endpoint behavior: auth, summaries, debug pages.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use gateward::admin::{admin_router, AdminState};
use gateward::config::RateLimitConfig;
use gateward::ratelimit::LimiterRegistry;

fn state() -> AdminState {
    let configs = BTreeMap::from([(
        "public".to_string(),
        RateLimitConfig {
            requests: 5,
            period_ms: 1000,
            size: 64,
            ..Default::default()
        },
    )]);
    AdminState {
        api_key: Arc::from("test-key"),
        registry: Arc::new(LimiterRegistry::from_config(&configs)),
    }
}

fn get(path: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(key) = key {
        builder = builder.header("Authorization", format!("Bearer {key}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn requires_bearer_token() {
    let router = admin_router(state());

    let res = router.clone().oneshot(get("/admin/status", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = router
        .clone()
        .oneshot(get("/admin/status", Some("wrong")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = router
        .oneshot(get("/admin/status", Some("test-key")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_string(res).await;
    assert!(body.contains("operational"));
}

#[tokio::test]
async fn limiter_summary_reflects_traffic() {
    let st = state();
    let limiter = st.registry.get("public").unwrap();
    limiter.allow("1.2.3.4".parse().unwrap());
    limiter.allow("5.6.7.8".parse().unwrap());

    let router = admin_router(st);
    let res = router
        .oneshot(get("/admin/limiters", Some("test-key")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_string(res).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed[0]["name"], "public");
    assert_eq!(parsed[0]["ipv4"]["tracked"], 2);
    assert_eq!(parsed[0]["ipv4"]["capacity"], 64);
    assert_eq!(parsed[0]["ipv6_64"]["tracked"], 0);
}

#[tokio::test]
async fn ratelimit_pages_render() {
    let st = state();
    st.registry
        .get("public")
        .unwrap()
        .allow("1.2.3.4".parse().unwrap());

    let router = admin_router(st);
    let res = router
        .clone()
        .oneshot(get("/admin/ratelimit", Some("test-key")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page = body_string(res).await;
    assert!(page.contains("<h1>public</h1>"));
    assert!(page.contains("<h2>IPv4</h2>"));
    assert!(page.contains("1.2.3.4"));

    let res = router
        .clone()
        .oneshot(get("/admin/ratelimit/public", Some("test-key")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let dump = body_string(res).await;
    assert!(dump.contains("## IPv4"));
    assert!(dump.contains("1.2.3.4"));

    let res = router
        .oneshot(get("/admin/ratelimit/missing", Some("test-key")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
