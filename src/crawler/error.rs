// ==========================================
// 光纤路由分析 - 截面抓取错误类型
// ==========================================
// 红线: 抓取错误不会中止运行, 由 Pipeline 记录为 FetchError 诊断
// ==========================================

use crate::i18n::{t, t_with_args};
use thiserror::Error;

/// 截面详情抓取错误
///
/// 需要 Clone: 失败结果在缓存中按 segment 记忆
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP 状态异常: {status} (segment={segment_id})")]
    HttpStatus { segment_id: String, status: u16 },

    #[error("网络请求失败: {0}")]
    Transport(String),

    #[error("HTTP 客户端初始化失败: {0}")]
    ClientBuild(String),

    #[error("响应读取失败: {0}")]
    Body(String),

    #[error("抓取已取消: segment={0}")]
    Cancelled(String),

    #[error("抓取已禁用")]
    Disabled,
}

impl FetchError {
    /// 是否值得重试（网络错误 / 429 / 5xx）
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// 按当前语言输出的错误原因（写入诊断）
    pub fn localized(&self) -> String {
        match self {
            FetchError::HttpStatus { status, .. } => {
                t_with_args("errors.fetch.http_status", &[("status", &status.to_string())])
            }
            FetchError::Transport(detail) => t_with_args("errors.fetch.transport", &[("detail", detail)]),
            FetchError::ClientBuild(detail) => {
                t_with_args("errors.fetch.client_build", &[("detail", detail)])
            }
            FetchError::Body(detail) => t_with_args("errors.fetch.body", &[("detail", detail)]),
            FetchError::Cancelled(_) => t("errors.fetch.cancelled"),
            FetchError::Disabled => t("errors.fetch.disabled"),
        }
    }
}

/// 需要重试的 HTTP 状态
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

// 实现 From<reqwest::Error>
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// Result 类型别名
pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::tests_support::LOCALE_TEST_LOCK;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Transport("reset".into()).is_retryable());
        assert!(FetchError::HttpStatus { segment_id: "1".into(), status: 503 }.is_retryable());
        assert!(FetchError::HttpStatus { segment_id: "1".into(), status: 429 }.is_retryable());
        assert!(!FetchError::HttpStatus { segment_id: "1".into(), status: 404 }.is_retryable());
        assert!(!FetchError::Cancelled("1".into()).is_retryable());
    }

    #[test]
    fn test_localized_reason_follows_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let err = FetchError::HttpStatus { segment_id: "1001".into(), status: 503 };

        crate::i18n::set_locale("en");
        assert_eq!(err.localized(), "HTTP status 503");

        crate::i18n::set_locale("zh-CN");
        assert_eq!(err.localized(), "HTTP 状态异常: 503");

        crate::i18n::set_locale("en");
    }
}
