// ==========================================
// 光纤路由分析 - 领域类型定义
// ==========================================
// 职责: 束管分类 / 路由纤芯类型 / 奇偶统计 / 诊断类别
// 红线: 分类是"规则制",不是评分制
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 束管分类 (Tube Category)
// ==========================================
// CAN2000 层级: Trunk / Junction / Local; 层级外统一为 NonCAN2000
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TubeCategory {
    #[serde(rename = "Trunk")]
    Trunk, // 干线
    #[serde(rename = "Junction")]
    Junction, // 中继
    #[serde(rename = "Local")]
    Local, // 本地
    #[serde(rename = "Non-CAN2000")]
    NonCan2000, // 层级外
}

impl TubeCategory {
    /// 是否属于 CAN2000 层级（Trunk / Junction / Local）
    pub fn is_can2000(&self) -> bool {
        !matches!(self, TubeCategory::NonCan2000)
    }
}

impl fmt::Display for TubeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TubeCategory::Trunk => write!(f, "Trunk"),
            TubeCategory::Junction => write!(f, "Junction"),
            TubeCategory::Local => write!(f, "Local"),
            TubeCategory::NonCan2000 => write!(f, "Non-CAN2000"),
        }
    }
}

// ==========================================
// 路由纤芯类型 (Fibre Type)
// ==========================================
// 来源: Fibre Trace Summary 的 Name 前缀 (L_ / J_ / T_) 或调用方指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FibreType {
    Local,
    Junction,
    Trunk,
}

impl FibreType {
    /// 按路由名前缀推断纤芯类型
    ///
    /// # 规则
    /// - L_ → Local
    /// - J_ → Junction
    /// - T_ → Trunk
    /// - 其他 → None
    pub fn from_path_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        if upper.starts_with("L_") {
            Some(FibreType::Local)
        } else if upper.starts_with("J_") {
            Some(FibreType::Junction)
        } else if upper.starts_with("T_") {
            Some(FibreType::Trunk)
        } else {
            None
        }
    }

    /// 对应的 CAN2000 束管分类
    pub fn as_tube(&self) -> TubeCategory {
        match self {
            FibreType::Local => TubeCategory::Local,
            FibreType::Junction => TubeCategory::Junction,
            FibreType::Trunk => TubeCategory::Trunk,
        }
    }
}

impl fmt::Display for FibreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FibreType::Local => write!(f, "Local"),
            FibreType::Junction => write!(f, "Junction"),
            FibreType::Trunk => write!(f, "Trunk"),
        }
    }
}

impl std::str::FromStr for FibreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "l" => Ok(FibreType::Local),
            "junction" | "j" => Ok(FibreType::Junction),
            "trunk" | "t" => Ok(FibreType::Trunk),
            other => Err(format!("未知纤芯类型: {}", other)),
        }
    }
}

// ==========================================
// 选中纤号奇偶 (Parity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Even,
    Odd,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::Even => write!(f, "even"),
            Parity::Odd => write!(f, "odd"),
        }
    }
}

// ==========================================
// 诊断类别 (Diagnostic Kind)
// ==========================================
// 全部为非致命问题; 致命的 ParseError 走 ImportError
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    FetchError,        // 截面抓取失败
    LookupMiss,        // 光缆名查不到 segment id
    FieldDefaultError, // 可选字段缺失, 已按默认值处理
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::FetchError => write!(f, "FETCH_ERROR"),
            DiagnosticKind::LookupMiss => write!(f, "LOOKUP_MISS"),
            DiagnosticKind::FieldDefaultError => write!(f, "FIELD_DEFAULT_ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibre_type_from_path_name() {
        assert_eq!(FibreType::from_path_name("L_MEL_001"), Some(FibreType::Local));
        assert_eq!(FibreType::from_path_name(" j_abc"), Some(FibreType::Junction));
        assert_eq!(FibreType::from_path_name("T_SYD"), Some(FibreType::Trunk));
        assert_eq!(FibreType::from_path_name("X_SYD"), None);
        assert_eq!(FibreType::from_path_name(""), None);
    }

    #[test]
    fn test_tube_category_display_and_serde() {
        assert_eq!(TubeCategory::NonCan2000.to_string(), "Non-CAN2000");
        let json = serde_json::to_string(&TubeCategory::NonCan2000).unwrap();
        assert_eq!(json, "\"Non-CAN2000\"");
        assert!(!TubeCategory::NonCan2000.is_can2000());
        assert!(TubeCategory::Junction.is_can2000());
    }

    #[test]
    fn test_fibre_type_from_str() {
        assert_eq!("Local".parse::<FibreType>().unwrap(), FibreType::Local);
        assert_eq!("trunk".parse::<FibreType>().unwrap(), FibreType::Trunk);
        assert!("metro".parse::<FibreType>().is_err());
    }
}
