//! Spark-style unit parsing and human-readable formatting.

use regex::Regex;
use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

const SIZE_PATTERN: &str = r"^(\d+(?:\.\d+)?)\s*([kKmMgGtT]?)([bB]?)$";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("unrecognized size: {0:?}")]
    Size(String),

    #[error("unrecognized boolean: {0:?}")]
    Bool(String),
}

/// Parse a Spark memory size such as `"8g"`, `"512m"` or `"2048"`.
///
/// A bare number is interpreted as MiB, matching Spark's handling of
/// `spark.*.memory`. A lone `b`/`B` suffix means plain bytes.
pub fn size_in_bytes(text: &str) -> Result<u64, UnitError> {
    let trimmed = text.trim();
    let size_re = Regex::new(SIZE_PATTERN).map_err(|_| UnitError::Size(text.to_string()))?;
    let caps = size_re
        .captures(trimmed)
        .ok_or_else(|| UnitError::Size(text.to_string()))?;
    let amount: f64 = caps[1]
        .parse()
        .map_err(|_| UnitError::Size(text.to_string()))?;

    let multiplier = match (&caps[2], &caps[3]) {
        ("", "") => MIB,
        ("", _) => 1,
        (unit, _) => match unit.to_ascii_lowercase().as_str() {
            "k" => KIB,
            "m" => MIB,
            "g" => GIB,
            "t" => TIB,
            _ => return Err(UnitError::Size(text.to_string())),
        },
    };

    Ok((amount * multiplier as f64).round() as u64)
}

/// Parse a Spark boolean property (`true`/`false`, `1`/`0`, `yes`/`no`).
pub fn parse_bool(text: &str) -> Result<bool, UnitError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(UnitError::Bool(text.to_string())),
    }
}

/// Format a duration given in seconds, e.g. `"2 h 3 m 4 s"`.
pub fn fmt_time(seconds: f64) -> String {
    if seconds > 0.0 && seconds < 0.1 {
        return format!("{seconds:.3} s");
    }
    if seconds < 60.0 {
        return if seconds.fract() == 0.0 {
            format!("{seconds:.0} s")
        } else {
            format!("{seconds:.1} s")
        };
    }

    let total = seconds.round() as u64;
    let (hours, rest) = (total / 3600, total % 3600);
    let (minutes, secs) = (rest / 60, rest % 60);
    if hours == 0 {
        format!("{minutes} m {secs} s")
    } else {
        format!("{hours} h {minutes} m {secs} s")
    }
}

/// Format a byte count with binary units, e.g. `"1.5 GB"`.
pub fn fmt_bytes(bytes: f64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    let mut value = bytes;
    let mut unit = 0;
    while value.abs() >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_with_units() {
        assert_eq!(size_in_bytes("1k").unwrap(), 1024);
        assert_eq!(size_in_bytes("512m").unwrap(), 512 * MIB);
        assert_eq!(size_in_bytes("8g").unwrap(), 8 * GIB);
        assert_eq!(size_in_bytes("8G").unwrap(), 8 * GIB);
        assert_eq!(size_in_bytes("2gb").unwrap(), 2 * GIB);
        assert_eq!(size_in_bytes("1t").unwrap(), TIB);
        assert_eq!(size_in_bytes("1.5g").unwrap(), GIB + GIB / 2);
    }

    #[test]
    fn bare_number_is_mebibytes() {
        assert_eq!(size_in_bytes("384").unwrap(), 384 * MIB);
        assert_eq!(size_in_bytes(" 2048 ").unwrap(), 2048 * MIB);
    }

    #[test]
    fn plain_byte_suffix() {
        assert_eq!(size_in_bytes("100b").unwrap(), 100);
        assert_eq!(size_in_bytes("100 B").unwrap(), 100);
    }

    #[test]
    fn rejects_garbage_sizes() {
        assert!(size_in_bytes("").is_err());
        assert!(size_in_bytes("lots").is_err());
        assert!(size_in_bytes("8x").is_err());
        assert!(size_in_bytes("-1g").is_err());
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("true"), Ok(true));
        assert_eq!(parse_bool("FALSE"), Ok(false));
        assert_eq!(parse_bool(" True "), Ok(true));
        assert_eq!(parse_bool("yes"), Ok(true));
        assert_eq!(parse_bool("0"), Ok(false));
        assert!(parse_bool("enabled").is_err());
    }

    #[test]
    fn time_formatting() {
        assert_eq!(fmt_time(0.0), "0 s");
        assert_eq!(fmt_time(0.05), "0.050 s");
        assert_eq!(fmt_time(12.0), "12 s");
        assert_eq!(fmt_time(12.34), "12.3 s");
        assert_eq!(fmt_time(125.0), "2 m 5 s");
        assert_eq!(fmt_time(7384.0), "2 h 3 m 4 s");
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(fmt_bytes(0.0), "0 B");
        assert_eq!(fmt_bytes(1000.0), "1000 B");
        assert_eq!(fmt_bytes(1536.0), "1.5 KB");
        assert_eq!(fmt_bytes(8.0 * GIB as f64), "8.0 GB");
    }
}
