//! Best-effort upload of location reports to the CRM backend.

use async_trait::async_trait;
use scout_core::config::ReporterConfig;
use scout_core::error::{ScoutError, ScoutResult};
use scout_core::LocationReport;
use tracing::debug;

use crate::PositionSink;

/// Posts each report as JSON to `{base_url}/data`.
///
/// One request per report: no retry, no queueing. The response body is only
/// logged.
pub struct HttpUploader {
    http: reqwest::Client,
    url: String,
}

impl HttpUploader {
    pub fn new(config: &ReporterConfig) -> ScoutResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ScoutError::Upload(format!("http client: {e}")))?;
        Ok(Self { http, url: config.upload_url() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PositionSink for HttpUploader {
    async fn upload(&self, report: &LocationReport) -> ScoutResult<()> {
        let resp = self
            .http
            .post(&self.url)
            .json(report)
            .send()
            .await
            .map_err(|e| ScoutError::Upload(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ScoutError::Upload(format!("HTTP {status}: {body}")));
        }
        debug!("[upload] {} ok: {body}", self.url);
        Ok(())
    }
}
