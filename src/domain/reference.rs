// ==========================================
// 光纤路由分析 - 参考库实体
// ==========================================
// 对齐: Cable / SpliceCases 表（参考库由外部流程维护）
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// CableReference - 光缆参考记录
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CableReference {
    pub name: String,
    pub cable_status: String,   // PD / DF / PA ...
    pub owner: String,
    pub iof: String,            // "Y" 表示 IOF
    pub construct_type: String, // BU / AR ...
    pub segment_id: String,     // 截面详情页 id，可能为空
}

impl CableReference {
    /// segment id（空串视为缺失）
    pub fn segment_id(&self) -> Option<&str> {
        let id = self.segment_id.trim();
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }
}

// ==========================================
// SpliceCaseReference - 接头盒参考记录
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpliceCaseReference {
    pub name: String,
    pub butt_splice: String, // "Y" 表示对接
    pub restricted: String,  // "Y" 表示受限
    pub rs_code: String,     // RS-NO / RS-RB ...
    pub rs_comments: String,
    pub manhole: String,
}
