use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

use ecovision::dashboard::SharedState;
use ecovision::emissions::EmissionFactors;
use ecovision::insights::{CompletionRequest, InsightSettings, LLMProvider};
use ecovision::server::{router, ServerState};
use ecovision::store::{JsonRecordStore, RecordStore};

/// Answers each insight call with a canned payload of the right shape
struct ScriptedProvider;

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let system = request.system.unwrap_or_default();
        if system.contains("\"recommendations\"") {
            return Ok(r#"{"recommendations": ["Fix compressed air leaks.", "Shift loads off-peak."]}"#.to_string());
        }
        if request.json_response {
            return Ok("```json\n{\"overallEmissionSummary\": \"Diesel dominates.\", \"peakUsageInsights\": \"Mondays peak.\", \
                \"idleTimeInsights\": \"Idle overnight.\", \"inefficiencyInsights\": \"Old boiler.\", \
                \"abnormalEnergySpikes\": \"None.\", \"potentialSavingsOverview\": \"About 10%.\"}\n```"
                .to_string());
        }
        Ok("Total emissions were 216 kg CO2.".to_string())
    }
}

async fn app() -> (Router, TempDir) {
    let temp_dir = tempdir().unwrap();
    let store: Arc<dyn RecordStore> =
        Arc::new(JsonRecordStore::open(temp_dir.path().join("records.json")).await.unwrap());
    let state = ServerState::new(
        store,
        Arc::new(SharedState::new()),
        Arc::new(ScriptedProvider),
        InsightSettings::default(),
        EmissionFactors::default(),
    );
    (router(state), temp_dir)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

fn diesel_day(date: &str) -> Value {
    json!({
        "date": date,
        "electricity_kwh": 100.0,
        "fuel_type": "diesel",
        "fuel_amount": 50.0,
        "production_units": 200.0,
        "production_hours": 8.0
    })
}

#[tokio::test]
async fn test_record_lifecycle() {
    let (app, _dir) = app().await;

    let (status, first) = send_json(&app, "POST", "/api/records", Some(diesel_day("2024-01-01"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send_json(&app, "POST", "/api/records", Some(diesel_day("2024-01-03T10:00:00Z"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, list) = send_json(&app, "GET", "/api/records", None).await;
    assert_eq!(status, StatusCode::OK);
    let dates: Vec<_> = list.as_array().unwrap().iter().map(|r| r["date"].as_str().unwrap().to_string()).collect();
    assert_eq!(dates, vec!["2024-01-03", "2024-01-01"]);

    let id = first["id"].as_str().unwrap();
    let notes = json!({ "thermal_image_description": "Hotspot on kiln door" });
    let (status, updated) = send_json(&app, "PUT", &format!("/api/records/{}/diagnostics", id), Some(notes)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["thermal_image_description"], "Hotspot on kiln door");

    let (status, _) = send(&app, "DELETE", &format!("/api/records/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send_json(&app, "DELETE", &format!("/api/records/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_invalid_records_rejected() {
    let (app, _dir) = app().await;

    let mut negative = diesel_day("2024-01-01");
    negative["electricity_kwh"] = json!(-5.0);
    let (status, body) = send_json(&app, "POST", "/api/records", Some(negative)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let mut unknown_fuel = diesel_day("2024-01-01");
    unknown_fuel["fuel_type"] = json!("kerosene");
    let (status, _) = send_json(&app, "POST", "/api/records", Some(unknown_fuel)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&app, "POST", "/api/records", Some(diesel_day("yesterday"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unpadded_dates_stored_padded_and_ordered() {
    let (app, _dir) = app().await;
    send(&app, "POST", "/api/records", Some(diesel_day("2024-02-01"))).await;
    let (status, created) = send_json(&app, "POST", "/api/records", Some(diesel_day("2024-1-5"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["date"], "2024-01-05");

    let (_, list) = send_json(&app, "GET", "/api/records", None).await;
    let dates: Vec<_> = list.as_array().unwrap().iter().map(|r| r["date"].as_str().unwrap().to_string()).collect();
    assert_eq!(dates, vec!["2024-02-01", "2024-01-05"]);

    let (_, summary) = send_json(&app, "GET", "/api/dashboard?from=2024-01-01&to=2024-02-29", None).await;
    assert_eq!(summary["daily"][0]["date"], "2024-01-05");
    assert_eq!(summary["daily"][1]["date"], "2024-02-01");
}

#[tokio::test]
async fn test_overflowing_quantities_rejected() {
    let (app, _dir) = app().await;

    let mut huge = diesel_day("2024-01-01");
    huge["fuel_amount"] = json!(1e308);
    let (status, body) = send_json(&app, "POST", "/api/records", Some(huge)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("representable"));

    let (_, list) = send_json(&app, "GET", "/api/records", None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_window() {
    let (app, _dir) = app().await;
    send(&app, "POST", "/api/records", Some(diesel_day("2024-01-01"))).await;
    send(&app, "POST", "/api/records", Some(diesel_day("2024-01-03"))).await;

    let (status, summary) = send_json(&app, "GET", "/api/dashboard?from=2024-01-01&to=2024-01-02", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["aggregate"]["record_count"], 1);
    assert_eq!(summary["aggregate"]["total_emissions"], 216.0);
    assert_eq!(summary["aggregate"]["emission_intensity"], 1.08);
    assert_eq!(summary["has_filtered_data"], true);

    let (status, _) = send_json(&app, "GET", "/api/dashboard?from=01/01/2024", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_json(&app, "GET", "/api/dashboard?to=2024-01-02", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("without a start"));
}

#[tokio::test]
async fn test_insight_flow_and_report() {
    let (app, _dir) = app().await;

    let (status, _) = send_json(&app, "POST", "/api/analysis", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send_json(&app, "POST", "/api/recommendations", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, "GET", "/api/report", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, "POST", "/api/records", Some(diesel_day("2024-01-01"))).await;

    let (status, analysis) = send_json(&app, "POST", "/api/analysis", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["overallEmissionSummary"], "Diesel dominates.");

    let (status, recs) = send_json(&app, "POST", "/api/recommendations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recs["recommendations"].as_array().unwrap().len(), 2);

    let (_, state) = send_json(&app, "GET", "/api/state", None).await;
    assert_eq!(state["loading"]["analysis"], false);
    assert!(state["error"].is_null());
    assert!(state["recommendations"].is_object());

    let (status, body) = send(&app, "GET", "/api/report", None).await;
    assert_eq!(status, StatusCode::OK);
    let markdown = String::from_utf8(body).unwrap();
    assert!(markdown.contains("## 2. Key Recommendations"));
    assert!(markdown.contains("1. Fix compressed air leaks."));
    assert!(markdown.contains("| 2024-01-01 | 100 | diesel | 50 L | 200 |"));
}

#[tokio::test]
async fn test_assistant_reply() {
    let (app, _dir) = app().await;

    let (status, reply) = send_json(&app, "POST", "/api/assistant", Some(json!({ "messages": [] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["name"], "Eco");
    assert!(reply["message"]["content"].as_str().unwrap().starts_with("Hello!"));

    let history = json!({ "messages": [{ "role": "user", "content": "Total emissions?" }] });
    let (_, reply) = send_json(&app, "POST", "/api/assistant", Some(history)).await;
    assert_eq!(reply["message"]["role"], "assistant");
    assert_eq!(reply["message"]["content"], "Total emissions were 216 kg CO2.");
}

#[tokio::test]
async fn test_analysis_rate_limited() {
    let (app, _dir) = app().await;
    for _ in 0..5 {
        let (status, _) = send_json(&app, "POST", "/api/analysis", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, _) = send_json(&app, "POST", "/api/analysis", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_diagnostics_stub() {
    let (app, _dir) = app().await;
    let request = json!({ "kind": "acoustic_recording", "file_name": "pump.wav", "content_base64": "aGVsbG8=" });
    let (status, reply) = send_json(&app, "POST", "/api/diagnostics", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["kind"], "acoustic_recording");
    assert!(reply["description"].as_str().unwrap().contains("5 bytes"));
}
