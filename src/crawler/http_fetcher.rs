// ==========================================
// 光纤路由分析 - HTTP 截面抓取
// ==========================================
// 工具: reqwest（rustls）
// 重试: 网络错误 / 429 / 5xx, 退避 = backoff * 2^(n-1)
// 取消: 每次重试前后检查 CancelFlag, 已取消则不再发请求
// ==========================================

use crate::config::PipelineConfig;
use crate::crawler::error::{is_retryable_status, FetchError, FetchResult};
use crate::crawler::DetailFetcher;
use crate::engine::CancelFlag;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub struct HttpDetailFetcher {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
    cancel: CancelFlag,
}

impl HttpDetailFetcher {
    /// 按运行配置构建
    pub fn new(config: &PipelineConfig) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;

        Ok(Self::with_client(client, config))
    }

    /// 使用已构建的客户端
    pub fn with_client(client: reqwest::Client, config: &PipelineConfig) -> Self {
        Self {
            client,
            base_url: config.cross_section_base_url.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            cancel: CancelFlag::new(),
        }
    }

    /// 与编排器共享取消标记
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// 详情页 URL: base + segment id
    pub fn url_for(&self, segment_id: &str) -> String {
        format!("{}{}", self.base_url, segment_id.trim())
    }

    /// 第 n 次重试前的等待（n 从 1 开始）
    fn backoff_for(&self, retry: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }

    async fn fetch_once(&self, url: &str, segment_id: &str) -> FetchResult<String> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                segment_id: segment_id.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Body(e.to_string()))
    }
}

#[async_trait]
impl DetailFetcher for HttpDetailFetcher {
    #[instrument(skip(self))]
    async fn fetch_detail(&self, segment_id: &str) -> FetchResult<String> {
        let url = self.url_for(segment_id);
        let mut retry = 0u32;

        loop {
            match self.fetch_once(&url, segment_id).await {
                Ok(body) => {
                    debug!(bytes = body.len(), retry, "截面详情抓取成功");
                    return Ok(body);
                }
                Err(err) if err.is_retryable() && retry < self.max_retries => {
                    if self.cancel.is_cancelled() {
                        debug!(error = %err, retry, "已取消, 放弃重试");
                        return Err(FetchError::Cancelled(segment_id.to_string()));
                    }
                    retry += 1;
                    let wait = self.backoff_for(retry);
                    warn!(error = %err, retry, wait_ms = wait.as_millis() as u64, "截面详情抓取失败, 准备重试");
                    tokio::time::sleep(wait).await;
                    if self.cancel.is_cancelled() {
                        return Err(FetchError::Cancelled(segment_id.to_string()));
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
