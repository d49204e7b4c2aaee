use crate::domain::rotation::RotationEntry;
use crate::domain::types::SailSortMode;
use std::cmp::Ordering;

/// 按排序方式比较两个帆号
///
/// - AsGiven: 恒等（配合稳定排序保持输入顺序）
/// - Numeric: 数字帆号按数值升序, 非数字帆号排在其后并按字节序
/// - Alphanumeric: 字节序
pub fn compare_sails(a: &str, b: &str, mode: SailSortMode) -> Ordering {
    match mode {
        SailSortMode::AsGiven => Ordering::Equal,
        SailSortMode::Alphanumeric => a.as_bytes().cmp(b.as_bytes()),
        SailSortMode::Numeric => {
            match (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.as_bytes().cmp(b.as_bytes())),
                (Ok(_), Err(_)) => Ordering::Less,
                (Err(_), Ok(_)) => Ordering::Greater,
                (Err(_), Err(_)) => a.as_bytes().cmp(b.as_bytes()),
            }
        }
    }
}

/// 帆号列表排序（稳定）
pub fn sort_sails(sails: &mut [String], mode: SailSortMode) {
    sails.sort_by(|a, b| compare_sails(a, b, mode));
}

/// 起始条目按帆号排序（稳定）
pub fn sort_entries(entries: &mut [RotationEntry], mode: SailSortMode) {
    entries.sort_by(|a, b| compare_sails(&a.sail, &b.sail, mode));
}
