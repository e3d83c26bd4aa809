// ==========================================
// 光纤路由分析 - 截面详情抓取层
// ==========================================
// 职责: 按 segment id 获取截面详情页标记
// 实现者: HttpDetailFetcher（reqwest）, 测试中的内存实现
// ==========================================

pub mod error;
pub mod http_fetcher;

use async_trait::async_trait;

// 重导出
pub use error::{FetchError, FetchResult};
pub use http_fetcher::HttpDetailFetcher;

// ==========================================
// DetailFetcher Trait
// ==========================================
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    /// 获取截面详情页
    ///
    /// # 返回
    /// - Ok(String): 页面标记
    /// - Err(FetchError): 网络 / 状态 / 取消
    async fn fetch_detail(&self, segment_id: &str) -> FetchResult<String>;
}

/// 不抓取（关闭抓取时使用）
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledFetcher;

#[async_trait]
impl DetailFetcher for DisabledFetcher {
    async fn fetch_detail(&self, _segment_id: &str) -> FetchResult<String> {
        Err(FetchError::Disabled)
    }
}
