// ==========================================
// 光纤路由分析 - 建议生成引擎
// ==========================================
// 职责: 根据参考库事实生成每行的建议文本
// 输入: 光缆参考 / 接头盒参考 / 束管分类 / 路由纤芯类型 / 告警标记
// 输出: Advisory（建议文本 + RS 类型 + IOF + 束管不匹配）
// 红线: 只读事实, 不访问存储; 文本全部走 i18n
// ==========================================

use crate::domain::reference::{CableReference, SpliceCaseReference};
use crate::domain::types::{FibreType, TubeCategory};
use crate::i18n::{t, t_with_args};

/// 非本公司光缆判定用的属主
pub const HOME_OWNER: &str = "OPTUS";

// 光缆名中标记 IOF 的片段
const IOF_NAME_TAGS: [&str; 4] = ["_AP", "_MA", "_SB", "_SM"];

/// 接头盒查询键: B 端截断至最后一个 '@'
///
/// "45BJL-Z@Pit 3" → "45BJL-Z"
pub fn splice_key(b_end: &str) -> &str {
    match b_end.rfind('@') {
        Some(idx) => b_end[..idx].trim(),
        None => b_end.trim(),
    }
}

/// 接头盒事实
#[derive(Debug, Clone, Copy)]
pub enum SpliceFacts<'a> {
    /// 本行无 Connect/Disconnect, 不查询
    NotRequired,
    /// 查询无结果（或查询失败）
    Missing,
    Found(&'a SpliceCaseReference),
}

/// 单行输入
#[derive(Debug, Clone, Copy)]
pub struct AdvisoryInput<'a> {
    pub cable_key: &'a str,
    pub tube: TubeCategory,
    pub alert: bool,
    pub cable: Option<&'a CableReference>,
    pub splice: SpliceFacts<'a>,
    pub path_type: Option<FibreType>,
}

/// 单行输出
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advisory {
    pub commentary: Vec<String>,
    pub rs_type: String,
    pub iof: bool,
    pub tube_mismatch: bool,
}

// ==========================================
// AdvisoryEngine
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisoryEngine;

impl AdvisoryEngine {
    pub fn new() -> Self {
        Self
    }

    /// 生成建议
    ///
    /// 顺序: 告警 → 光缆 → 接头盒 → 纤芯类型
    pub fn evaluate(&self, input: &AdvisoryInput<'_>) -> Advisory {
        let mut advisory = Advisory::default();

        if input.alert {
            advisory.commentary.push(t("advisory.alert_found"));
        }
        if let Some(cable) = input.cable {
            self.cable_advice(cable, input.cable_key, &mut advisory);
        }
        self.splice_advice(input.splice, &mut advisory);
        self.fibre_type_advice(input.path_type, input.tube, &mut advisory);

        advisory
    }

    fn cable_advice(&self, cable: &CableReference, cable_key: &str, advisory: &mut Advisory) {
        let name_upper = cable.name.to_uppercase();
        let status = cable.cable_status.trim();
        let owner = cable.owner.trim();
        let construct = cable.construct_type.trim().to_uppercase();
        let notes = &mut advisory.commentary;

        if name_upper.contains("ZLS") || status == "PD" {
            notes.push(t("advisory.cable_decommissioned"));
        }
        if status == "DF" {
            notes.push(t("advisory.cable_defective"));
        }
        if status == "PA" {
            notes.push(t("advisory.cable_new_build"));
        }
        if !owner.is_empty() && owner.to_uppercase() != HOME_OWNER {
            notes.push(t("advisory.cable_not_owned"));
        }

        let key_upper = cable_key.to_uppercase();
        let iof = cable.iof.trim().eq_ignore_ascii_case("Y")
            || IOF_NAME_TAGS.iter().any(|tag| key_upper.contains(tag));
        if iof {
            advisory.iof = true;
            notes.push(t("advisory.cable_iof"));
        }

        match construct.as_str() {
            "BU" => notes.push(t("advisory.cable_buried")),
            "AR" => notes.push(t("advisory.cable_aerial")),
            _ => {}
        }
        if cable.name.starts_with("OF") {
            notes.push(t("advisory.cable_of"));
        }
    }

    fn splice_advice(&self, splice: SpliceFacts<'_>, advisory: &mut Advisory) {
        let case = match splice {
            SpliceFacts::NotRequired => return,
            SpliceFacts::Missing => {
                advisory.commentary.push(t("advisory.splice_missing"));
                return;
            }
            SpliceFacts::Found(case) => case,
        };

        let notes = &mut advisory.commentary;
        if case.butt_splice.trim().eq_ignore_ascii_case("Y") {
            notes.push(t("advisory.splice_butt"));
        }

        let rs_code = case.rs_code.trim().to_uppercase();
        let restricted = case.restricted.trim().eq_ignore_ascii_case("Y");
        if restricted && rs_code != "RS-NO" {
            notes.push(t_with_args("advisory.splice_restricted", &[("code", &rs_code)]));
        } else if rs_code == "RS-NO" {
            notes.push(t_with_args("advisory.splice_rs_no", &[("code", &rs_code)]));
        } else if rs_code == "RS-RB" {
            notes.push(t_with_args("advisory.splice_rs_rb", &[("code", &rs_code)]));
        }

        let comments = case.rs_comments.to_lowercase();
        let manhole = case.manhole.to_uppercase();
        if comments.contains("substation") {
            notes.push(t("advisory.splice_substation"));
        }
        if comments.contains("citipower") || manhole.contains("CP_") {
            notes.push(t("advisory.splice_citipower"));
        }
        if comments.contains("etsa") || manhole.contains("ET_") {
            notes.push(t("advisory.splice_etsa"));
        }
        if comments.contains("tunnel") {
            notes.push(t("advisory.splice_tunnel"));
        }

        advisory.rs_type = rs_code;
    }

    fn fibre_type_advice(&self, path_type: Option<FibreType>, tube: TubeCategory, advisory: &mut Advisory) {
        let Some(path_type) = path_type else {
            return;
        };

        let key = match (path_type, tube) {
            (FibreType::Local, TubeCategory::Trunk) => Some("advisory.local_on_trunk"),
            (FibreType::Local, TubeCategory::Junction) => Some("advisory.local_on_junction"),
            (FibreType::Junction, TubeCategory::Trunk) => Some("advisory.junction_on_trunk"),
            (FibreType::Trunk, TubeCategory::Local | TubeCategory::Junction) => {
                Some("advisory.trunk_on_lower")
            }
            _ => None,
        };
        if let Some(key) = key {
            advisory.commentary.push(t(key));
        }

        advisory.tube_mismatch = tube.is_can2000() && tube != path_type.as_tube();
    }
}
