// ==========================================
// 光纤路由分析 - 纤盘映射
// ==========================================
// 职责: 选中纤号 → 纤盘范围 + 可见性
// 规则: 本行或上一行 Connect/Disconnect 非空时可见
// 红线: 单次自左向右遍历, 只携带一个布尔量
// ==========================================

use crate::domain::trace::{CableSegmentRecord, TrayRange};

/// 纤盘映射器（携带上一行的 C/D 状态）
#[derive(Debug, Clone, Default)]
pub struct TrayMapper {
    prev_has_connect: bool,
}

impl TrayMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 映射下一条记录（必须按记录顺序调用）
    pub fn map_next(&mut self, record: &CableSegmentRecord) -> TrayRange {
        let current = record.has_connect_disconnect();
        let visible = current || self.prev_has_connect;
        self.prev_has_connect = current;
        TrayRange::for_fibre(record.selected_fibre).with_visibility(visible)
    }

    /// 重置携带状态（新一次运行）
    pub fn reset(&mut self) {
        self.prev_has_connect = false;
    }

    /// 一次性映射全部记录
    pub fn map_all(records: &[CableSegmentRecord]) -> Vec<TrayRange> {
        let mut mapper = Self::new();
        records.iter().map(|r| mapper.map_next(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(selected: u32, cd: &str) -> CableSegmentRecord {
        CableSegmentRecord {
            sequence: 1,
            a_end: String::new(),
            cable_name: format!("X(#{})", selected),
            b_end: String::new(),
            connect_disconnect: cd.to_string(),
            exchange_owner: String::new(),
            length_text: String::new(),
            selected_fibre: selected,
            total_fibres: None,
        }
    }

    #[test]
    fn test_visibility_carries_one_row() {
        let records = vec![
            record(1, ""),
            record(8, "Connect3:1"),
            record(13, ""),
            record(19, ""),
            record(25, "  "),
            record(31, "Disconnect"),
        ];
        let trays = TrayMapper::map_all(&records);
        let visible: Vec<bool> = trays.iter().map(|t| t.visible).collect();
        assert_eq!(visible, vec![false, true, true, false, false, true]);

        assert_eq!(trays[0].display(), "");
        assert_eq!(trays[1].display(), "7-12");
        assert_eq!(trays[2].display(), "13-18");
    }

    #[test]
    fn test_mapper_reset() {
        let mut mapper = TrayMapper::new();
        assert!(mapper.map_next(&record(1, "C")).visible);
        mapper.reset();
        assert!(!mapper.map_next(&record(1, "")).visible);
    }
}
