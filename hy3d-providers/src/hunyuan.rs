use crate::request::HttpRequest;
use hy3d_core::{
    ApiError, ClientConfig, GenerationRequest, JobId, QUERY_ENDPOINT, SUBMIT_ENDPOINT,
    build_endpoint_url,
};
use serde::Serialize;

pub const MODEL_ID: &str = "hunyuan-3d-1.0";

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    #[serde(rename = "Url")]
    url: &'a str,
}

// Both dialects' field names are sent so either backend flavour accepts the body.
#[derive(Debug, Serialize)]
struct SubmitPayload<'a> {
    #[serde(rename = "Prompt", skip_serializing_if = "Option::is_none")]
    prompt_primary: Option<&'a str>,
    #[serde(rename = "ImageUrl", skip_serializing_if = "Option::is_none")]
    image_primary: Option<ImageUrl<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct QueryPayload<'a> {
    #[serde(rename = "JobId")]
    job_id: &'a str,
}

pub fn submit_payload(request: &GenerationRequest) -> serde_json::Value {
    let payload = match request {
        GenerationRequest::Text { prompt } => SubmitPayload {
            prompt_primary: Some(prompt),
            image_primary: None,
            prompt: Some(prompt),
            image: None,
            model: MODEL_ID,
        },
        GenerationRequest::Image { image_data } => SubmitPayload {
            prompt_primary: None,
            image_primary: Some(ImageUrl { url: image_data }),
            prompt: None,
            image: Some(image_data),
            model: MODEL_ID,
        },
    };
    serde_json::to_value(payload).unwrap_or_default()
}

pub fn build_submit_request(
    cfg: &ClientConfig,
    request: &GenerationRequest,
) -> Result<HttpRequest, ApiError> {
    build_request(cfg, SUBMIT_ENDPOINT, &submit_payload(request))
}

pub fn build_query_request(cfg: &ClientConfig, job_id: &JobId) -> Result<HttpRequest, ApiError> {
    let payload = serde_json::to_value(QueryPayload {
        job_id: job_id.as_str(),
    })
    .unwrap_or_default();
    build_request(cfg, QUERY_ENDPOINT, &payload)
}

fn build_request(
    cfg: &ClientConfig,
    endpoint: &str,
    payload: &serde_json::Value,
) -> Result<HttpRequest, ApiError> {
    let url = build_endpoint_url(&cfg.base_url, endpoint, cfg.use_proxy, &cfg.proxy_url);
    url::Url::parse(&url).map_err(|e| ApiError::Config(format!("invalid request URL {url:?}: {e}")))?;

    Ok(HttpRequest::post_json(url, cfg.authorization_header(), payload))
}
