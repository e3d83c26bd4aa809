// ==========================================
// 光纤路由分析 - 纤盘告警判定
// ==========================================
// 职责: 读取截面表的某个纤盘范围, 判定是否存在受限电路
// 规则: OS 名以 T_ 开头, 或 Bearer 含 OTS / DWDM（均不区分大小写）
// 红线: 范围无法解析或为空时一律返回 false
// ==========================================

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::trace;

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*-\s*(\d+)\s*$").expect("纤盘范围正则"));

// ==========================================
// HeaderIndex - 大小写不敏感的表头索引
// ==========================================
// 每张截面表只构建一次
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    lowered: Vec<String>,
    exact: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(headers: &[String]) -> Self {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut exact = HashMap::with_capacity(lowered.len());
        for (idx, h) in lowered.iter().enumerate() {
            exact.entry(h.clone()).or_insert(idx);
        }
        Self { lowered, exact }
    }

    /// 精确匹配（不区分大小写）
    pub fn exact(&self, name: &str) -> Option<usize> {
        self.exact.get(&name.to_lowercase()).copied()
    }

    /// 首个包含给定片段的列
    pub fn containing(&self, needle: &str) -> Option<usize> {
        let needle = needle.to_lowercase();
        self.lowered.iter().position(|h| h.contains(&needle))
    }

    /// 精确匹配优先, 否则按包含匹配
    pub fn resolve(&self, exact: &str, fallback_contains: &str) -> Option<usize> {
        self.exact(exact).or_else(|| self.containing(fallback_contains))
    }

    /// OS 名列
    pub fn name_column(&self) -> Option<usize> {
        self.resolve("os name", "name")
    }

    /// Bearer 列
    pub fn bearer_column(&self) -> Option<usize> {
        self.resolve("bearer id", "bearer")
    }

    pub fn len(&self) -> usize {
        self.lowered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lowered.is_empty()
    }
}

// ==========================================
// AlertRules - 告警规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRules {
    pub trunk_prefix: String,            // OS 名前缀
    pub restricted_bearers: Vec<String>, // Bearer 关键字
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            trunk_prefix: "T_".to_string(),
            restricted_bearers: vec!["OTS".to_string(), "DWDM".to_string()],
        }
    }
}

/// 解析 "start-end"（1 起, 闭区间）, 起止颠倒时交换
pub fn parse_tray_range(text: &str) -> Option<(usize, usize)> {
    let caps = RANGE_RE.captures(text)?;
    let a = caps.get(1)?.as_str().parse::<usize>().ok()?;
    let b = caps.get(2)?.as_str().parse::<usize>().ok()?;
    Some(if a > b { (b, a) } else { (a, b) })
}

// ==========================================
// TrayAlertEvaluator
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct TrayAlertEvaluator {
    rules: AlertRules,
}

impl TrayAlertEvaluator {
    pub fn new(rules: AlertRules) -> Self {
        Self {
            rules: Self::normalized(rules),
        }
    }

    fn normalized(rules: AlertRules) -> AlertRules {
        AlertRules {
            trunk_prefix: rules.trunk_prefix.to_uppercase(),
            restricted_bearers: rules
                .restricted_bearers
                .into_iter()
                .map(|b| b.to_uppercase())
                .filter(|b| !b.is_empty())
                .collect(),
        }
    }

    pub fn rules(&self) -> &AlertRules {
        &self.rules
    }

    /// 判定纤盘是否告警
    ///
    /// # 参数
    /// - headers: 截面表表头
    /// - rows: 截面表数据行
    /// - tray_range: "start-end"
    pub fn evaluate(&self, headers: &[String], rows: &[Vec<String>], tray_range: &str) -> bool {
        self.evaluate_indexed(&HeaderIndex::new(headers), rows, tray_range)
    }

    /// 使用已构建的表头索引判定
    pub fn evaluate_indexed(
        &self,
        index: &HeaderIndex,
        rows: &[Vec<String>],
        tray_range: &str,
    ) -> bool {
        let Some((start, end)) = parse_tray_range(tray_range) else {
            return false;
        };
        let start = start.max(1);
        let end = end.min(rows.len());
        if start > end {
            return false;
        }

        let name_idx = index.name_column();
        let bearer_idx = index.bearer_column();

        let hit = rows[start - 1..end]
            .iter()
            .any(|row| self.row_alerts(row, name_idx, bearer_idx));
        trace!(tray_range, start, end, hit, "纤盘告警判定");
        hit
    }

    /// 单行判定（缺失列不参与判定）
    pub fn row_alerts(&self, row: &[String], name_idx: Option<usize>, bearer_idx: Option<usize>) -> bool {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(|v| v.trim().to_uppercase())
                .unwrap_or_default()
        };

        let name = cell(name_idx);
        if !self.rules.trunk_prefix.is_empty() && name.starts_with(&self.rules.trunk_prefix) {
            return true;
        }

        let bearer = cell(bearer_idx);
        self.rules
            .restricted_bearers
            .iter()
            .any(|kw| bearer.contains(kw.as_str()))
    }
}
