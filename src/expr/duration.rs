// src/expr/duration.rs

//! Duration literals such as `"2s"`, `"250ms"` or `"1.5m"`.
//!
//! Used both by the scenario file (trigger durations, step size) and by the
//! expression evaluator, where a duration operand becomes a number of
//! seconds.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(ns|us|ms|s|min|m|h)\s*$").expect("valid duration regex")
});

/// True if `s` looks like a duration literal.
pub fn is_duration_literal(s: &str) -> bool {
    DURATION_RE.is_match(s)
}

/// Parse a duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let caps = DURATION_RE.captures(s).ok_or_else(|| {
        format!("invalid duration '{s}'; expected <number><unit> with unit ns, us, ms, s, m, or h")
    })?;

    let value: f64 = caps[1]
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", &caps[1], e))?;

    let secs = match &caps[2] {
        "ns" => value / 1e9,
        "us" => value / 1e6,
        "ms" => value / 1e3,
        "s" => value,
        "m" | "min" => value * 60.0,
        "h" => value * 3600.0,
        unit => return Err(format!("unsupported duration unit '{unit}'")),
    };

    Duration::try_from_secs_f64(secs).map_err(|e| format!("duration '{s}' out of range: {e}"))
}
