// ==========================================
// 光纤路由分析 - 选中纤号奇偶统计
// ==========================================

use crate::domain::types::Parity;

/// 多数奇偶（忽略 0; 持平或无数据返回 None）
pub fn majority_parity(selected_fibres: &[u32]) -> Option<Parity> {
    let (even, odd) = selected_fibres
        .iter()
        .filter(|n| **n != 0)
        .fold((0usize, 0usize), |(even, odd), n| {
            if n % 2 == 0 {
                (even + 1, odd)
            } else {
                (even, odd + 1)
            }
        });

    match even.cmp(&odd) {
        std::cmp::Ordering::Greater => Some(Parity::Even),
        std::cmp::Ordering::Less => Some(Parity::Odd),
        std::cmp::Ordering::Equal => None,
    }
}

/// 单个纤号的奇偶（0 表示未选纤）
pub fn parity_of(fibre: u32) -> Option<Parity> {
    match fibre {
        0 => None,
        n if n % 2 == 0 => Some(Parity::Even),
        _ => Some(Parity::Odd),
    }
}

/// 纤号奇偶与多数不一致（多数未定或未选纤时为 false）
pub fn is_parity_mismatch(fibre: u32, majority: Option<Parity>) -> bool {
    match (parity_of(fibre), majority) {
        (Some(own), Some(majority)) => own != majority,
        _ => false,
    }
}
