use std::collections::HashSet;

/// A `MIN-MAX` pair as given on the command line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NumericRange {
    pub low: f64,
    pub high: f64,
}

pub fn parse_range(value: &str) -> Result<NumericRange, String> {
    let trimmed = value.trim();
    let (low, high) = trimmed
        .split_once('-')
        .ok_or_else(|| "expected format MIN-MAX".to_string())?;
    let low: f64 = low
        .trim()
        .parse()
        .map_err(|_| "invalid MIN value".to_string())?;
    let high: f64 = high
        .trim()
        .parse()
        .map_err(|_| "invalid MAX value".to_string())?;
    if !low.is_finite() || !high.is_finite() {
        return Err("range values must be finite".to_string());
    }
    if low > high {
        return Err("MIN must not exceed MAX".to_string());
    }
    Ok(NumericRange { low, high })
}

/// Comma-separated list, trimmed, blanks dropped, first occurrence kept.
pub fn parse_csv_list(value: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for part in value.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        if seen.insert(item.to_string()) {
            out.push(item.to_string());
        }
    }
    out
}

/// Merges genre lists keeping first-seen order.
pub fn merge_unique(base: Vec<String>, extra: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = base.iter().cloned().collect();
    let mut out = base;
    for item in extra {
        if seen.insert(item.clone()) {
            out.push(item.clone());
        }
    }
    out
}
