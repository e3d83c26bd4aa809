// ==========================================
// 光纤路由分析 - 截面缓存层
// ==========================================
// 职责: 截面详情页解析 + 按 segment 去重缓存
// 红线: 缓存由 Pipeline 持有, 不使用全局状态
// ==========================================

pub mod cross_section;
pub mod segment_cache;

// 重导出
pub use cross_section::{CrossSectionTable, CROSS_SECTION_TABLE_ID};
pub use segment_cache::{SegmentCache, SegmentCacheEntry};
