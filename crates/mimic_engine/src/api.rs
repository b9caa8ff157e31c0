use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use mimic_logging::{mimic_debug, mimic_warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::types::{Envelope, ErrorBody, WireResults, WireStatus};
use crate::{
    AnalysisResults, ApiError, AuthGrant, HealthReport, StatusReport, TriggerAck, UploadedVideo,
    VideoFile, VideoList,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
    pub upload_chunk_bytes: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(600),
            upload_chunk_bytes: 64 * 1024,
        }
    }
}

/// Receives upload progress as a percentage in `0..=100`.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, percent: u8);
}

/// Video and analysis endpoints. All calls need a bearer token.
#[async_trait::async_trait]
pub trait AutomationApi: Send + Sync {
    async fn upload_video(
        &self,
        token: &str,
        file: &VideoFile,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<UploadedVideo, ApiError>;

    async fn trigger_analysis(&self, token: &str, video_id: &str) -> Result<TriggerAck, ApiError>;

    async fn analysis_status(&self, token: &str, video_id: &str) -> Result<StatusReport, ApiError>;

    async fn analysis_results(
        &self,
        token: &str,
        video_id: &str,
    ) -> Result<AnalysisResults, ApiError>;

    async fn list_videos(&self, token: &str) -> Result<VideoList, ApiError>;

    async fn health(&self) -> Result<HealthReport, ApiError>;
}

#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError>;

    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<AuthGrant, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: ApiSettings,
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", settings.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(settings.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;

        Ok(Self {
            settings,
            base_url,
            client,
        })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        decode_envelope(status, &body)
    }

    fn json_body(
        &self,
        request: reqwest::RequestBuilder,
        body: serde_json::Value,
    ) -> reqwest::RequestBuilder {
        request
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
    }
}

#[async_trait::async_trait]
impl AutomationApi for ReqwestBackend {
    async fn upload_video(
        &self,
        token: &str,
        file: &VideoFile,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<UploadedVideo, ApiError> {
        let url = self.endpoint(&["videos", "upload"])?;
        mimic_debug!(
            "POST {} file={} media_type={} bytes={}",
            url,
            file.file_name,
            file.media_type,
            file.len()
        );

        sink.emit(0);
        let body = progress_body(
            file.bytes.clone(),
            self.settings.upload_chunk_bytes,
            sink.clone(),
        );
        let part = Part::stream_with_length(body, file.len())
            .file_name(file.file_name.clone())
            .mime_str(&file.media_type)
            .map_err(|_| ApiError::InvalidMediaType(file.media_type.clone()))?;
        let form = Form::new().part("video", part);

        let request = self
            .client
            .post(url)
            .bearer_auth(token)
            .timeout(self.settings.upload_timeout)
            .multipart(form);
        let uploaded: UploadedVideo = self.execute(request).await?;
        sink.emit(100);
        Ok(uploaded)
    }

    async fn trigger_analysis(&self, token: &str, video_id: &str) -> Result<TriggerAck, ApiError> {
        let url = self.endpoint(&["automation", "trigger", video_id])?;
        mimic_debug!("POST {}", url);
        let request = self
            .client
            .post(url)
            .bearer_auth(token)
            .timeout(self.settings.request_timeout);
        self.execute(request).await
    }

    async fn analysis_status(&self, token: &str, video_id: &str) -> Result<StatusReport, ApiError> {
        let url = self.endpoint(&["automation", "status", video_id])?;
        mimic_debug!("GET {}", url);
        let request = self
            .client
            .get(url)
            .bearer_auth(token)
            .timeout(self.settings.request_timeout);
        let wire: WireStatus = self.execute(request).await?;
        Ok(StatusReport::from_wire(video_id, wire))
    }

    async fn analysis_results(
        &self,
        token: &str,
        video_id: &str,
    ) -> Result<AnalysisResults, ApiError> {
        let url = self.endpoint(&["automation", "results", video_id])?;
        mimic_debug!("GET {}", url);
        let request = self
            .client
            .get(url)
            .bearer_auth(token)
            .timeout(self.settings.request_timeout);
        let wire: WireResults = self.execute(request).await?;
        Ok(AnalysisResults::from_wire(video_id, wire))
    }

    async fn list_videos(&self, token: &str) -> Result<VideoList, ApiError> {
        let url = self.endpoint(&["videos", "my-videos"])?;
        mimic_debug!("GET {}", url);
        let request = self
            .client
            .get(url)
            .bearer_auth(token)
            .timeout(self.settings.request_timeout);
        self.execute(request).await
    }

    async fn health(&self) -> Result<HealthReport, ApiError> {
        let url = self.endpoint(&["automation", "health"])?;
        mimic_debug!("GET {}", url);
        let request = self.client.get(url).timeout(self.settings.request_timeout);
        self.execute(request).await
    }
}

#[async_trait::async_trait]
impl AuthApi for ReqwestBackend {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let url = self.endpoint(&["auth", "login"])?;
        mimic_debug!("POST {}", url);
        let request = self.json_body(
            self.client.post(url).timeout(self.settings.request_timeout),
            serde_json::json!({ "email": email, "password": password }),
        );
        self.execute(request).await
    }

    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let url = self.endpoint(&["auth", "signup"])?;
        mimic_debug!("POST {}", url);
        let request = self.json_body(
            self.client.post(url).timeout(self.settings.request_timeout),
            serde_json::json!({ "name": name, "email": email, "password": password }),
        );
        self.execute(request).await
    }
}

/// Splits the file into chunks and reports progress as the transport pulls them.
fn progress_body(bytes: Bytes, chunk_size: usize, sink: Arc<dyn ProgressSink>) -> reqwest::Body {
    let total = bytes.len();
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<Bytes> = (0..total)
        .step_by(chunk_size)
        .map(|start| bytes.slice(start..(start + chunk_size).min(total)))
        .collect();

    let mut sent = 0usize;
    let stream = futures_util::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        sink.emit(percent(sent as u64, total as u64));
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}

fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u8
}

fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ApiError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|err| err.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        mimic_warn!("backend rejected request: {} {}", status.as_u16(), message);
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice::<Envelope<T>>(body)
        .map(|envelope| envelope.data)
        .map_err(|err| {
            mimic_warn!("unexpected response shape: {}", err);
            ApiError::Rejected {
                status: status.as_u16(),
                message: format!("unexpected response shape: {err}"),
            }
        })
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout(err.to_string());
    }
    ApiError::Network(err.to_string())
}
