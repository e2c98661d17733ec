use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A filterable numeric dimension backed by one range slider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Price,
    Size,
}

impl Dimension {
    /// The unit text the display string carries (`$` prefix or ` GB` suffix).
    pub fn unit(self) -> &'static str {
        match self {
            Dimension::Price => "$",
            Dimension::Size => " GB",
        }
    }

    pub fn step(self) -> f64 {
        match self {
            Dimension::Price => 1.0,
            Dimension::Size => 0.1,
        }
    }

    /// Decimal places the step resolves to.
    pub fn step_decimals(self) -> u32 {
        match self {
            Dimension::Price => 0,
            Dimension::Size => 1,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Price => write!(f, "price"),
            Dimension::Size => write!(f, "size"),
        }
    }
}

/// Rounds half toward positive infinity, the way browsers round.
pub fn js_round(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    (value + 0.5).floor()
}

/// Renders a number the way a browser stringifies it (`5` rather than `5.0`).
pub fn js_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        // `{:e}` gives the same shortest digits; browsers sign positive exponents.
        let exp = format!("{:e}", value);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        };
    }
    format!("{}", value)
}

fn float_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:Infinity|\d+(?:\.\d*)?(?:[eE][+-]?\d+)?|\.\d+(?:[eE][+-]?\d+)?)")
            .expect("float prefix pattern")
    })
}

/// Parses the longest numeric prefix after leading whitespace; NaN when there is none.
pub fn parse_float_prefix(input: &str) -> f64 {
    let trimmed = input.trim_start();
    let Some(m) = float_prefix_re().find(trimmed) else {
        return f64::NAN;
    };
    let text = m.as_str();
    match text.trim_start_matches(['+', '-']) {
        "Infinity" if text.starts_with('-') => f64::NEG_INFINITY,
        "Infinity" => f64::INFINITY,
        _ => text.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// Strict whole-string numeric conversion: blank is zero, anything unparsable is NaN.
pub fn to_number(input: &str) -> f64 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        other => other.parse::<f64>().unwrap_or(f64::NAN),
    }
}

fn strip_unit(dimension: Dimension, display: &str) -> String {
    display.replacen(dimension.unit(), "", 1)
}

/// The slider's `to` formatter.
pub fn format_value(dimension: Dimension, value: f64) -> String {
    match dimension {
        Dimension::Price => format!("${}", js_number(js_round(value))),
        Dimension::Size => format!("{} GB", js_number(js_round(value * 10.0) / 10.0)),
    }
}

/// The slider's `from` parser: the display string back to a number.
pub fn parse_display(dimension: Dimension, display: &str) -> f64 {
    to_number(&strip_unit(dimension, display))
}

/// Numeric value for the hidden form field mirroring one handle.
pub fn mirror_number(dimension: Dimension, display: &str) -> f64 {
    match dimension {
        Dimension::Price => js_round(parse_display(dimension, display)),
        Dimension::Size => parse_float_prefix(&strip_unit(dimension, display)),
    }
}

/// Text written into the hidden input, free of unit characters.
pub fn mirror_value(dimension: Dimension, display: &str) -> String {
    js_number(mirror_number(dimension, display))
}

/// Label shown after a slider update: both formatted handles joined.
pub fn range_label(low: &str, high: &str) -> String {
    format!("{} - {}", low, high)
}

/// Label written once at startup from the raw start bounds.
pub fn initial_label(dimension: Dimension, start_min: f64, start_max: f64) -> String {
    match dimension {
        Dimension::Price => format!("${} - ${}", js_number(start_min), js_number(start_max)),
        Dimension::Size => format!(
            "{} GB - {} GB",
            js_number(start_min),
            js_number(start_max)
        ),
    }
}
