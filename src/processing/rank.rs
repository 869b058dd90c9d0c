//! Ranking of aggregated counts into display order.

use std::cmp::Ordering;

use crate::types::StatisticsItem;

use super::aggregate::CellSnapshot;

/// Lower-case `input`, then upper-case the first code point of each whitespace-separated
/// word and join the words with single spaces.
///
/// Idempotent; strings of digits are returned unchanged. Digraph letters (`ǆ`, `ǉ`, `ǌ`, `ǳ`)
/// take their titlecase form rather than the upper-case one. A first letter whose upper-case
/// form is more than one character is left as is.
pub fn title_case(input: &str) -> String {
    input
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    if let Some(title) = digraph_titlecase(first) {
                        return std::iter::once(title).chain(chars).collect::<String>();
                    }
                    let mut upper = first.to_uppercase();
                    // Multi-char expansions (e.g. 'ß') keep the original letter.
                    let head = match (upper.next(), upper.next()) {
                        (Some(u), None) => u,
                        _ => first,
                    };
                    std::iter::once(head).chain(chars).collect::<String>()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Titlecase of the Latin digraph letters, the only single-char titlecase forms in Unicode
/// that differ from upper case.
fn digraph_titlecase(c: char) -> Option<char> {
    match c {
        '\u{01C4}'..='\u{01C6}' => Some('\u{01C5}'),
        '\u{01C7}'..='\u{01C9}' => Some('\u{01C8}'),
        '\u{01CA}'..='\u{01CC}' => Some('\u{01CB}'),
        '\u{01F1}'..='\u{01F3}' => Some('\u{01F2}'),
        _ => None,
    }
}

/// Total order for output items: count descending, then value by code point of its
/// lower-cased form, then value by code point.
pub fn compare_items(a: &StatisticsItem, b: &StatisticsItem) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| a.value.to_lowercase().cmp(&b.value.to_lowercase()))
        .then_with(|| a.value.cmp(&b.value))
}

/// Turn aggregator cells into title-cased, deterministically ordered items.
pub fn rank(cells: Vec<CellSnapshot>) -> Vec<StatisticsItem> {
    let mut items: Vec<StatisticsItem> = cells
        .into_iter()
        .map(|c| StatisticsItem::new(title_case(&c.display_raw), c.count))
        .collect();
    items.sort_by(compare_items);
    items
}
