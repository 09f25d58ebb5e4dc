use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use marketboard_api::routes::market::{CACHE_CONTROL_FAILED, CACHE_CONTROL_OK, CONTENT_TYPE_JSON};
use marketboard_api::server::{AppState, build_router};
use marketboard_core::common::time::FakeClockProvider;
use marketboard_core::market::entity::{InstrumentKey, Quote, QuoteEnvelope, SourceQuote};
use marketboard_core::market::error::MarketError;
use marketboard_core::market::port::{QuoteEngine, SourceKind};
use marketboard_core::testing::{Scripted, ScriptedDashboard, ScriptedSource, StaticEngine, quote};
use marketboard_market::aggregator::QuoteAggregator;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;

fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap()
}

fn app(engine: Arc<dyn QuoteEngine>) -> axum::Router {
    build_router(AppState { engine })
}

// 帮助函数：发送请求并返回状态、头与 JSON 响应体
async fn call(
    router: axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, json)
}

#[tokio::test]
async fn test_ok_envelope_is_cacheable() {
    let mut items = BTreeMap::new();
    items.insert(
        InstrumentKey::Kospi,
        Quote::from_source("KOSPI", quote(2615.32, 27.17, 1.05)),
    );
    let engine = Arc::new(StaticEngine::new(QuoteEnvelope::assemble(items, fixed_time())));

    let (status, headers, body) = call(app(engine), "GET", "/api/market").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], CONTENT_TYPE_JSON);
    assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL_OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["updated_at"], "2024-05-01T06:30:00.000Z");
    assert_eq!(body["items"]["kospi"]["symbol"], "KOSPI");
    assert_eq!(body["items"]["kospi"]["price"], 2615.32);
    assert!(body["items"]["kospi"]["time"].is_null());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_empty_envelope_is_not_cached() {
    let engine = Arc::new(StaticEngine::new(QuoteEnvelope::assemble(
        BTreeMap::new(),
        fixed_time(),
    )));

    let (status, headers, body) = call(app(engine), "GET", "/api/market").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL_FAILED);
    assert_eq!(body["ok"], false);
    assert_eq!(body["items"], serde_json::json!({}));
}

#[tokio::test]
async fn test_aggregation_failure_still_returns_200() {
    let engine = Arc::new(StaticEngine::new(QuoteEnvelope::failed(
        "task panicked",
        fixed_time(),
    )));

    let (status, headers, body) = call(app(engine), "GET", "/api/market").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL_FAILED);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "task panicked");
    assert_eq!(body["items"], serde_json::json!({}));
}

#[tokio::test]
async fn test_dashboard_outage_served_through_router() {
    let aggregator = QuoteAggregator::new(
        Arc::new(ScriptedDashboard::failing(MarketError::Network("connection reset".into()))),
        Arc::new(
            ScriptedSource::new(SourceKind::Stooq)
                .with("^KOSPI", Scripted::Quote(quote(2600.0, 5.0, 0.19))),
        ),
        Arc::new(
            ScriptedSource::new(SourceKind::YahooChart)
                .with("USDKRW=X", Scripted::Quote(quote(1375.2, 2.1, 0.15)))
                .with("^DJI", Scripted::Quote(quote(39000.5, 120.0, 0.31)))
                .with("^IXIC", Scripted::Quote(quote(16300.0, -40.0, -0.25)))
                .with("^GSPC", Scripted::Quote(SourceQuote {
                    price: Some(5000.0),
                    change: Some(10.0),
                    pct: None,
                    time: Some("2024-05-01T06:30:00.000Z".to_string()),
                })),
        ),
    )
    .with_clock(Arc::new(FakeClockProvider::new(fixed_time())));

    let (status, headers, body) = call(app(Arc::new(aggregator)), "GET", "/api/market").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL_OK);
    assert_eq!(body["ok"], true);
    let items = body["items"].as_object().unwrap();
    // kosdaq 的回退链没有可用数据，直接缺席
    assert_eq!(items.len(), 5);
    assert!(items.get("kosdaq").is_none());
    assert_eq!(items["kospi"]["symbol"], "^KOSPI");
    assert_eq!(items["sp500"]["time"], "2024-05-01T06:30:00.000Z");
}

#[tokio::test]
async fn test_unknown_path_returns_json_404() {
    let engine = Arc::new(StaticEngine::new(QuoteEnvelope::assemble(
        BTreeMap::new(),
        fixed_time(),
    )));

    let (status, _, body) = call(app(engine), "GET", "/api/stocks").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("/api/stocks"));
}

#[tokio::test]
async fn test_wrong_method_returns_405() {
    let engine = Arc::new(StaticEngine::new(QuoteEnvelope::assemble(
        BTreeMap::new(),
        fixed_time(),
    )));

    let (status, _, body) = call(app(engine), "POST", "/api/market").await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_openapi_document_lists_market_route() {
    let engine = Arc::new(StaticEngine::new(QuoteEnvelope::assemble(
        BTreeMap::new(),
        fixed_time(),
    )));

    let (status, _, body) = call(app(engine), "GET", "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/api/market").is_some());
    assert!(body["components"]["schemas"].get("QuoteEnvelope").is_some());
}
