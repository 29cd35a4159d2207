//! Matching computed partition indexes to target names.
//!
//! Targets are data source or table names ending with their partition
//! index, e.g. `ds_1` or `t_order_03`.

/// Trailing digits of a target name.
pub fn suffix(target: &str) -> &str {
    let digits = target
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .count();
    &target[target.len() - digits..]
}

/// Does the target end with the partition index?
///
/// With a padding width, the suffix must match exactly, e.g. `03`.
/// Without it, leading zeros are ignored.
pub fn matches(target: &str, index: usize, width: Option<usize>) -> bool {
    let suffix = suffix(target);
    if suffix.is_empty() {
        return false;
    }

    match width {
        Some(width) => suffix == format!("{:0width$}", index, width = width),
        None => suffix.parse::<usize>().map(|n| n == index).unwrap_or(false),
    }
}

/// Find the target for a partition index.
pub fn find(available: &[String], index: usize, width: Option<usize>) -> Option<&String> {
    available
        .iter()
        .find(|target| matches(target, index, width))
}

/// Targets matching any of the indexes, in the order they are available.
pub fn find_all(available: &[String], indexes: &[usize], width: Option<usize>) -> Vec<String> {
    available
        .iter()
        .filter(|target| indexes.iter().any(|index| matches(target, *index, width)))
        .cloned()
        .collect()
}
