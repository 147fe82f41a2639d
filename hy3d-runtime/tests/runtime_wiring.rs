use hy3d_core::{ClientConfig, GenerationRequest, JobId};
use hy3d_engine::SessionStatus;
use hy3d_runtime::{ConfigStore, Settings, build_controller};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn json_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json")
}

#[tokio::test]
async fn stored_settings_drive_a_full_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/ai3d/submit"))
        .and(header("authorization", "Bearer sk-stored"))
        .respond_with(json_response(json!({"Response": {"JobId": "job-1"}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/ai3d/query"))
        .respond_with(json_response(json!({
            "Response": {"Status": "DONE", "JobId": "job-1"}
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/ai3d/query"))
        .respond_with(json_response(json!({
            "Response": {"Status": "COMPLETED", "Result": {"CoverUrl": "https://x/c.png"}}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::at_path(dir.path().join("config.json"));
    store
        .save(&Settings {
            client: ClientConfig::new()
                .with_api_key("sk-stored")
                .with_base_url(format!("{}/v1/ai3d", server.uri())),
            poll_interval_ms: 20,
        })
        .unwrap();

    let ctl = build_controller(&store.load().unwrap()).unwrap();
    assert_eq!(ctl.poll_interval(), Duration::from_millis(20));
    let started = ctl
        .start(GenerationRequest::text("a red chair").unwrap())
        .await;
    assert_eq!(started.job_id, Some(JobId::new("job-1")));

    let done = tokio::time::timeout(Duration::from_secs(10), ctl.wait_for_terminal())
        .await
        .unwrap();
    assert_eq!(done.status, SessionStatus::Success);
    assert_eq!(done.result_url.as_deref(), Some("https://x/c.png"));
}
