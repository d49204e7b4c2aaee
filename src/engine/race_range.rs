// ==========================================
// 帆船赛计分引擎 - 场次范围编解码
// ==========================================
// 格式: "1-4,6-7,10" (升序、去重、连续段以 - 连接、段间以 , 分隔)
// 约定: 非法字符或畸形片段返回空结果, 调用方按"未选择场次"处理
// ==========================================

use serde::{Deserialize, Serialize};

/// 场次范围解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceRange {
    numbers: Vec<u32>,
}

impl RaceRange {
    /// 空结果（无场次）
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn numbers(&self) -> &[u32] {
        &self.numbers
    }

    pub fn into_numbers(self) -> Vec<u32> {
        self.numbers
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn contains(&self, number: u32) -> bool {
        self.numbers.binary_search(&number).is_ok()
    }
}

/// 解析场次范围字符串
///
/// # 参数
/// - `input`: 例如 "1-4,6-7,10", 空白字符忽略
///
/// # 返回
/// 升序去重的场次号; 含非法字符或畸形片段时返回 `RaceRange::empty()`
pub fn parse_range(input: &str) -> RaceRange {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if !compact.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '-') {
        return RaceRange::empty();
    }

    let mut numbers = Vec::new();
    for token in compact.split(',') {
        if token.is_empty() {
            continue;
        }

        let mut bounds = token.split('-');
        let (Some(first), second, None) = (bounds.next(), bounds.next(), bounds.next()) else {
            return RaceRange::empty();
        };

        let Ok(start) = first.parse::<u32>() else {
            return RaceRange::empty();
        };
        let end = match second {
            None => start,
            Some(s) => match s.parse::<u32>() {
                Ok(v) => v,
                Err(_) => return RaceRange::empty(),
            },
        };

        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        numbers.extend((lo..=hi).filter(|n| *n > 0));
    }

    numbers.sort_unstable();
    numbers.dedup();
    RaceRange { numbers }
}

/// 生成场次范围字符串
///
/// # 参数
/// - `numbers`: 任意顺序、可重复的场次号
///
/// # 返回
/// 规范化的范围字符串, 输入为空时返回空串
pub fn make_range(numbers: &[u32]) -> String {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs: Vec<String> = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(mut start) = iter.next() else {
        return String::new();
    };
    let mut last = start;

    for n in iter {
        if last.checked_add(1) == Some(n) {
            last = n;
            continue;
        }
        runs.push(render_run(start, last));
        start = n;
        last = n;
    }
    runs.push(render_run(start, last));

    runs.join(",")
}

fn render_run(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}
