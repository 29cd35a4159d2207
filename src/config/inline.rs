//! Inline expressions describing many names at once.
//!
//! `ds_${0..1}.t_order_${0..1}` expands to `ds_0.t_order_0`, `ds_0.t_order_1`,
//! `ds_1.t_order_0` and `ds_1.t_order_1`. Lists are written as `${[a, b]}`.
//! Several expressions can be separated by commas.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").unwrap());

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("unclosed \"${{\" in \"{0}\"")]
    Unclosed(String),

    #[error("invalid range \"{0}\"")]
    InvalidRange(String),

    #[error("empty inline expression")]
    Empty,
}

/// Expand an inline expression into every name it describes.
pub fn expand(expression: &str) -> Result<Vec<String>, Error> {
    let mut names = vec![];

    for segment in split(expression)? {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        names.extend(expand_segment(segment)?);
    }

    if names.is_empty() {
        return Err(Error::Empty);
    }

    Ok(names)
}

/// Split on commas outside of `${...}`.
fn split(expression: &str) -> Result<Vec<&str>, Error> {
    let mut segments = vec![];
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in expression.char_indices() {
        match c {
            '{' if expression[..i].ends_with('$') => depth += 1,
            '}' if depth > 0 => depth -= 1,
            ',' if depth == 0 => {
                segments.push(&expression[start..i]);
                start = i + 1;
            }
            _ => (),
        }
    }

    if depth > 0 {
        return Err(Error::Unclosed(expression.to_string()));
    }

    segments.push(&expression[start..]);
    Ok(segments)
}

fn expand_segment(segment: &str) -> Result<Vec<String>, Error> {
    let mut names = vec![String::new()];
    let mut cursor = 0;

    for captures in PLACEHOLDER.captures_iter(segment) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        let literal = &segment[cursor..whole.start()];
        let choices = choices(inner.as_str())?;

        names = names
            .iter()
            .flat_map(|prefix| {
                choices
                    .iter()
                    .map(move |choice| format!("{}{}{}", prefix, literal, choice))
            })
            .collect();

        cursor = whole.end();
    }

    let rest = &segment[cursor..];
    if rest.contains("${") {
        return Err(Error::Unclosed(segment.to_string()));
    }

    Ok(names
        .into_iter()
        .map(|name| format!("{}{}", name, rest))
        .collect())
}

fn choices(inner: &str) -> Result<Vec<String>, Error> {
    let inner = inner.trim();

    if let Some(list) = inner.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return Ok(list
            .split(',')
            .map(|item| item.trim().trim_matches('\'').trim_matches('"').to_string())
            .filter(|item| !item.is_empty())
            .collect());
    }

    let invalid = || Error::InvalidRange(inner.to_string());
    let (start, end) = inner.split_once("..").ok_or_else(invalid)?;
    let (start, end) = (start.trim(), end.trim());
    let first: u64 = start.parse().map_err(|_| invalid())?;
    let last: u64 = end.parse().map_err(|_| invalid())?;

    if last < first {
        return Err(invalid());
    }

    // `${00..15}` keeps the padding.
    let width = if start.len() > 1 && start.starts_with('0') {
        start.len()
    } else {
        0
    };

    Ok((first..=last)
        .map(|i| format!("{:0width$}", i, width = width))
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cartesian() {
        assert_eq!(
            expand("ds_${0..1}.t_order_${0..1}").unwrap(),
            vec![
                "ds_0.t_order_0",
                "ds_0.t_order_1",
                "ds_1.t_order_0",
                "ds_1.t_order_1"
            ]
        );
    }

    #[test]
    fn test_list_and_commas() {
        assert_eq!(
            expand("ds_0.t_user, ds_${[1, 3]}.t_user_${0..1}").unwrap(),
            vec![
                "ds_0.t_user",
                "ds_1.t_user_0",
                "ds_1.t_user_1",
                "ds_3.t_user_0",
                "ds_3.t_user_1"
            ]
        );
    }

    #[test]
    fn test_padding() {
        assert_eq!(
            expand("t_${08..10}").unwrap(),
            vec!["t_08", "t_09", "t_10"]
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(expand(""), Err(Error::Empty));
        assert!(matches!(expand("t_${3..1}"), Err(Error::InvalidRange(_))));
        assert!(matches!(expand("t_${a}"), Err(Error::InvalidRange(_))));
        assert!(matches!(expand("t_${0..1"), Err(Error::Unclosed(_))));
    }
}
