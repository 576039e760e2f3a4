// Seed formatting for seedprobe
// Embeds a raw seed into an input's existing value according to a Format

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy for embedding a seed into an input value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// Replace the value with the seed verbatim
    Straight,
    /// Append the seed to the existing value
    Append,
    /// Terminate the seed with a NUL byte (null-byte truncation probes)
    Null,
    /// Terminate the seed with a semicolon (command/argument separator probes)
    Semicolon,
}

impl Format {
    pub fn all() -> Vec<Format> {
        vec![Format::Straight, Format::Append, Format::Null, Format::Semicolon]
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Straight => write!(f, "straight"),
            Format::Append => write!(f, "append"),
            Format::Null => write!(f, "null"),
            Format::Semicolon => write!(f, "semicolon"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "straight" => Ok(Format::Straight),
            "append" => Ok(Format::Append),
            "null" => Ok(Format::Null),
            "semicolon" => Ok(Format::Semicolon),
            other => Err(format!("Unknown format: {}", other)),
        }
    }
}

/// Build the string actually injected for `seed` given an input's current value.
///
/// - Straight  → `seed`
/// - Append    → `original + seed`
/// - Null      → `seed + "\0"`
/// - Semicolon → `seed + ";"`
pub fn format_seed(seed: &str, original: &str, format: Format) -> String {
    match format {
        Format::Straight => seed.to_string(),
        Format::Append => format!("{}{}", original, seed),
        Format::Null => format!("{}\0", seed),
        Format::Semicolon => format!("{};", seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // Single Format Tests
    // ============================================

    #[test]
    fn test_straight_replaces_value() {
        assert_eq!(format_seed("X", "orig", Format::Straight), "X");
    }

    #[test]
    fn test_append_keeps_original() {
        assert_eq!(format_seed("X", "orig", Format::Append), "origX");
    }

    #[test]
    fn test_null_terminates_seed() {
        assert_eq!(format_seed("X", "orig", Format::Null), "X\0");
    }

    #[test]
    fn test_semicolon_terminates_seed() {
        assert_eq!(format_seed("X", "orig", Format::Semicolon), "X;");
    }

    #[test]
    fn test_straight_and_append_coincide_without_value() {
        assert_eq!(
            format_seed("X", "", Format::Straight),
            format_seed("X", "", Format::Append)
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("NULL".parse::<Format>(), Ok(Format::Null));
        assert_eq!(" append ".parse::<Format>(), Ok(Format::Append));
        assert!("reverse".parse::<Format>().is_err());
    }
}
