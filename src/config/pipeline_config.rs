// ==========================================
// 光纤路由分析 - 运行配置
// ==========================================
// 职责: 截面抓取 / 并发 / 语言 / 告警规则的配置项与默认值
// 来源: 默认值 → config_kv 覆写 → 命令行覆写
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::engine::alert_evaluator::AlertRules;
use serde::{Deserialize, Serialize};

/// 截面详情页地址（拼接 segment id）
pub const DEFAULT_CROSS_SECTION_BASE_URL: &str =
    "https://cadprdwebw001.optus.com.au/vmr/CrossSectionReview.aspx?id=";

pub const DEFAULT_USER_AGENT: &str = "FibreAssist/1.0";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;
pub const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cross_section_base_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub fetch_concurrency: usize,
    pub user_agent: String,
    pub crawl_enabled: bool,
    pub locale: String,
    pub alert_rules: AlertRules,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cross_section_base_url: DEFAULT_CROSS_SECTION_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            crawl_enabled: true,
            locale: DEFAULT_LOCALE.to_string(),
            alert_rules: AlertRules::default(),
        }
    }
}

impl PipelineConfig {
    /// 校验配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.fetch_concurrency == 0 {
            return Err(invalid("fetch_concurrency", "0", "并发数必须 ≥ 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "0", "超时必须 > 0"));
        }
        if self.crawl_enabled && self.cross_section_base_url.trim().is_empty() {
            return Err(invalid("cross_section_base_url", "", "启用抓取时地址不能为空"));
        }
        Ok(())
    }
}

pub(crate) fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff_ms, 500);
        assert!(config.crawl_enabled);
        assert!(config.cross_section_base_url.ends_with("?id="));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = PipelineConfig {
            fetch_concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"crawl_enabled": false}"#).unwrap();
        assert!(!config.crawl_enabled);
        assert_eq!(config.fetch_concurrency, DEFAULT_FETCH_CONCURRENCY);
    }
}
