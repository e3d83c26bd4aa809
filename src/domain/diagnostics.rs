// ==========================================
// 光纤路由分析 - 运行诊断
// ==========================================
// 职责: 收集一次运行中的非致命问题
// 类别: FetchError / LookupMiss / FieldDefaultError
// ==========================================

use crate::domain::types::DiagnosticKind;
use serde::{Deserialize, Serialize};

/// 单条诊断
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostic {
    pub kind: DiagnosticKind,
    pub record_index: Option<usize>, // 结果行下标（0 起）
    pub segment_id: Option<String>,
    pub message: String,
}

/// 诊断收集器（每次运行重建）
#[derive(Debug, Clone, Default)]
pub struct RunDiagnostics {
    items: Vec<RunDiagnostic>,
}

impl RunDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: RunDiagnostic) {
        self.items.push(diagnostic);
    }

    /// 记录与某条记录相关的诊断
    pub fn record(&mut self, kind: DiagnosticKind, record_index: usize, message: impl Into<String>) {
        self.items.push(RunDiagnostic {
            kind,
            record_index: Some(record_index),
            segment_id: None,
            message: message.into(),
        });
    }

    /// 记录与某个 segment 相关的诊断
    pub fn segment(&mut self, kind: DiagnosticKind, segment_id: &str, message: impl Into<String>) {
        self.items.push(RunDiagnostic {
            kind,
            record_index: None,
            segment_id: Some(segment_id.to_string()),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = RunDiagnostic>) {
        self.items.extend(other);
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunDiagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<RunDiagnostic> {
        self.items
    }
}
