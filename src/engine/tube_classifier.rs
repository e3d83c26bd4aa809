// ==========================================
// 光纤路由分析 - 束管分类引擎
// ==========================================
// 红线: 分类是"规则制",不是评分制; 不抛错误
// ==========================================
// 职责: 按光缆名 / 两端接头盒类型 / 芯数判定束管分类
// 输入: CableSegmentRecord
// 输出: TubeCategory
// ==========================================

use crate::domain::trace::CableSegmentRecord;
use crate::domain::types::TubeCategory;
use tracing::instrument;

/// 骨干光缆前缀
pub const BACKBONE_PREFIX: &str = "BLS";

/// 骨干分带的最小总芯数
pub const BACKBONE_MIN_FIBRES: u32 = 144;

/// 每端分带宽度（前 24 芯 Trunk, 后 24 芯 Local）
pub const BAND_WIDTH: u32 = 24;

// 144 芯 AJL/BJL 光缆的本地芯区间
const LOCAL_RANGES_144: [(u32, u32); 2] = [(49, 72), (121, 144)];

// ==========================================
// EndpointType - 接头盒类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointType {
    Ajl,
    Bjl,
    Fjl,
}

impl EndpointType {
    /// 按包含的标记识别端点类型（区分大小写, 依次尝试 AJL / BJL / FJL）
    pub fn detect(end: &str) -> Option<Self> {
        if end.contains("AJL") {
            Some(EndpointType::Ajl)
        } else if end.contains("BJL") {
            Some(EndpointType::Bjl)
        } else if end.contains("FJL") {
            Some(EndpointType::Fjl)
        } else {
            None
        }
    }
}

// ==========================================
// TubeClassifier
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct TubeClassifier;

impl TubeClassifier {
    pub fn new() -> Self {
        Self
    }

    /// 记录分类
    pub fn classify_record(&self, record: &CableSegmentRecord) -> TubeCategory {
        self.classify(
            &record.cable_name,
            record.total_fibres,
            record.selected_fibre,
            &record.a_end,
            &record.b_end,
        )
    }

    /// 束管分类
    ///
    /// # 规则
    /// 1. BLS 前缀且总芯数 ≥ 144: 按位置分带
    /// 2. 否则按两端类型:
    ///    - BJL/BJL, FJL/BJL, BJL/FJL: 按位置分带
    ///    - AJL/BJL（任意顺序）: 144 芯按固定区间, 其余按末 24 芯
    ///    - 其他: NonCAN2000
    /// 3. 光缆名含 FSS 时强制 NonCAN2000, 两端均含 BJL 除外
    #[instrument(level = "trace", skip(self))]
    pub fn classify(
        &self,
        cable_name: &str,
        total_fibres: Option<u32>,
        selected_fibre: u32,
        a_end: &str,
        b_end: &str,
    ) -> TubeCategory {
        let tube = self.classify_by_rules(cable_name, total_fibres, selected_fibre, a_end, b_end);

        if is_fss_cable(cable_name) && !(is_bjl_case(a_end) && is_bjl_case(b_end)) {
            return TubeCategory::NonCan2000;
        }
        tube
    }

    fn classify_by_rules(
        &self,
        cable_name: &str,
        total_fibres: Option<u32>,
        selected_fibre: u32,
        a_end: &str,
        b_end: &str,
    ) -> TubeCategory {
        let known_total = total_fibres.filter(|t| *t > 0);

        if cable_name.starts_with(BACKBONE_PREFIX)
            && known_total.map_or(false, |t| t >= BACKBONE_MIN_FIBRES)
        {
            return band_by_position(selected_fibre, known_total);
        }

        use EndpointType::*;
        match (EndpointType::detect(a_end), EndpointType::detect(b_end)) {
            (Some(Bjl), Some(Bjl)) | (Some(Fjl), Some(Bjl)) | (Some(Bjl), Some(Fjl)) => {
                band_by_position(selected_fibre, known_total)
            }
            (Some(Ajl), Some(Bjl)) | (Some(Bjl), Some(Ajl)) => {
                if known_total == Some(BACKBONE_MIN_FIBRES) {
                    let local = LOCAL_RANGES_144
                        .iter()
                        .any(|(lo, hi)| (*lo..=*hi).contains(&selected_fibre));
                    if local {
                        TubeCategory::Local
                    } else {
                        TubeCategory::Junction
                    }
                } else if selected_fibre != 0 && in_last_band(selected_fibre, known_total) {
                    TubeCategory::Local
                } else {
                    TubeCategory::Junction
                }
            }
            _ => TubeCategory::NonCan2000,
        }
    }
}

/// 位置分带: 前 24 芯 Trunk, 末 24 芯 Local, 其余 Junction
///
/// 总芯数未知时不会落入 Local
fn band_by_position(selected_fibre: u32, known_total: Option<u32>) -> TubeCategory {
    if selected_fibre <= BAND_WIDTH {
        TubeCategory::Trunk
    } else if in_last_band(selected_fibre, known_total) {
        TubeCategory::Local
    } else {
        TubeCategory::Junction
    }
}

fn in_last_band(selected_fibre: u32, known_total: Option<u32>) -> bool {
    known_total.map_or(false, |total| {
        i64::from(selected_fibre) > i64::from(total) - i64::from(BAND_WIDTH)
    })
}

fn is_fss_cable(cable_name: &str) -> bool {
    cable_name.to_uppercase().contains("FSS")
}

fn is_bjl_case(end: &str) -> bool {
    end.to_uppercase().contains("BJL")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(cable: &str, total: Option<u32>, selected: u32, a: &str, b: &str) -> TubeCategory {
        TubeClassifier::new().classify(cable, total, selected, a, b)
    }

    #[test]
    fn test_backbone_banding() {
        assert_eq!(classify("BLS001(#10)", Some(288), 10, "X", "Y"), TubeCategory::Trunk);
        assert_eq!(classify("BLS001(#100)", Some(288), 100, "X", "Y"), TubeCategory::Junction);
        assert_eq!(classify("BLS001(#270)", Some(288), 270, "X", "Y"), TubeCategory::Local);
        // 芯数不足 144 不走骨干分带
        assert_eq!(classify("BLS001(#10)", Some(96), 10, "X", "Y"), TubeCategory::NonCan2000);
        // 前缀区分大小写
        assert_eq!(classify("bls001(#10)", Some(288), 10, "X", "Y"), TubeCategory::NonCan2000);
    }

    #[test]
    fn test_ajl_bjl_144_fixed_ranges() {
        let c = |n| classify("33UA(#n)", Some(144), n, "12AJL-X", "34BJL-Y");
        assert_eq!(c(70), TubeCategory::Local);
        // 60 落在本地带 49-72 内, 按规则为 Local（不是 Junction）
        assert_eq!(c(60), TubeCategory::Local);
        assert_eq!(c(48), TubeCategory::Junction);
        assert_eq!(c(73), TubeCategory::Junction);
        assert_eq!(c(121), TubeCategory::Local);
        assert_eq!(c(144), TubeCategory::Local);
        assert_eq!(c(1), TubeCategory::Junction);

        // 顺序无关
        assert_eq!(
            classify("X", Some(144), 70, "34BJL-Y", "12AJL-X"),
            TubeCategory::Local
        );
    }

    #[test]
    fn test_ajl_bjl_other_totals() {
        assert_eq!(classify("X", Some(96), 80, "AJL", "BJL"), TubeCategory::Local);
        assert_eq!(classify("X", Some(96), 72, "AJL", "BJL"), TubeCategory::Junction);
        assert_eq!(classify("X", None, 80, "AJL", "BJL"), TubeCategory::Junction);
        assert_eq!(classify("X", Some(0), 80, "AJL", "BJL"), TubeCategory::Junction);
        assert_eq!(classify("X", Some(12), 0, "AJL", "BJL"), TubeCategory::Junction);
    }

    #[test]
    fn test_bjl_family_banding_with_unknown_total() {
        assert_eq!(classify("X", None, 5, "BJL1", "BJL2"), TubeCategory::Trunk);
        assert_eq!(classify("X", None, 500, "BJL1", "BJL2"), TubeCategory::Junction);
        assert_eq!(classify("X", Some(96), 80, "FJL1", "BJL2"), TubeCategory::Local);
        assert_eq!(classify("X", Some(96), 40, "BJL1", "FJL2"), TubeCategory::Junction);
        // 小芯数不会下溢
        assert_eq!(classify("X", Some(12), 30, "BJL1", "BJL2"), TubeCategory::Local);
    }

    #[test]
    fn test_endpoint_detection_order_and_case() {
        // 同时含 AJL 与 BJL 时按 AJL
        assert_eq!(EndpointType::detect("AJL/BJL"), Some(EndpointType::Ajl));
        assert_eq!(EndpointType::detect("xbjl"), None);
        assert_eq!(classify("X", Some(96), 10, "AJL", "AJL"), TubeCategory::NonCan2000);
        assert_eq!(classify("X", Some(96), 10, "FJL", "FJL"), TubeCategory::NonCan2000);
        assert_eq!(classify("X", Some(96), 10, "", "BJL"), TubeCategory::NonCan2000);
    }

    #[test]
    fn test_fss_override() {
        // 两端均为 BJL: 保持常规分类
        assert_eq!(classify("FSS 12(#5)", Some(96), 5, "BJL-A", "BJL-B"), TubeCategory::Trunk);
        // BJL/AJL: 强制 NonCAN2000
        assert_eq!(
            classify("FSS 12(#70)", Some(144), 70, "BJL-A", "AJL-B"),
            TubeCategory::NonCan2000
        );
        // 大小写不敏感
        assert_eq!(classify("fss 12", Some(288), 5, "X", "Y"), TubeCategory::NonCan2000);
        // 豁免同样大小写不敏感
        assert_eq!(
            classify("BLS-FSS(#5)", Some(288), 5, "bjl-a", "Bjl-b"),
            TubeCategory::Trunk
        );
    }
}
