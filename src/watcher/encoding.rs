//! Text encodings used by installer logs.
//!
//! Burn-based bootstrappers write UTF-8 logs while msiexec writes
//! UTF-16LE. Both are split on `\n` at code-unit granularity so a line
//! boundary is only ever recognized on an aligned unit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Encoding of a watched log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEncoding {
    /// UTF-8, also covers plain ASCII logs.
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    /// Little-endian UTF-16, two bytes per code unit.
    #[serde(alias = "utf-16le", alias = "utf16", alias = "ucs2")]
    Utf16Le,
}

/// Returned when an encoding name is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown log encoding: {0}")]
pub struct UnknownEncoding(pub String);

/// Lines decoded from a run of complete-line bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedLines {
    /// Decoded lines without terminators.
    pub lines: Vec<String>,
    /// Number of malformed fragments that were dropped.
    pub anomalies: usize,
}

impl LogEncoding {
    /// Bytes per code unit.
    #[must_use]
    pub fn unit_width(self) -> usize {
        match self {
            Self::Utf8 => 1,
            Self::Utf16Le => 2,
        }
    }

    /// Byte-order mark written at the start of a file in this encoding.
    #[must_use]
    pub fn bom(self) -> &'static [u8] {
        match self {
            Self::Utf8 => &[0xEF, 0xBB, 0xBF],
            Self::Utf16Le => &[0xFF, 0xFE],
        }
    }

    /// Length of the longest prefix of `buf` that ends on a line boundary.
    ///
    /// Returns 0 when `buf` holds no complete line yet.
    #[must_use]
    pub fn complete_prefix_len(self, buf: &[u8]) -> usize {
        match self {
            Self::Utf8 => buf.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1),
            Self::Utf16Le => (0..buf.len() / 2)
                .rev()
                .find(|&unit| buf[unit * 2] == b'\n' && buf[unit * 2 + 1] == 0)
                .map_or(0, |unit| unit * 2 + 2),
        }
    }

    /// Decode bytes made of complete lines and split them.
    ///
    /// Malformed sequences are skipped rather than replaced, and a trailing
    /// `\r` is removed from each line.
    #[must_use]
    pub fn decode_lines(self, bytes: &[u8]) -> DecodedLines {
        let mut text = String::with_capacity(bytes.len() / self.unit_width());
        let mut anomalies = 0;

        match self {
            Self::Utf8 => {
                for chunk in bytes.utf8_chunks() {
                    text.push_str(chunk.valid());
                    if !chunk.invalid().is_empty() {
                        anomalies += 1;
                    }
                }
            }
            Self::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    anomalies += 1;
                }
                let units = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
                for decoded in char::decode_utf16(units) {
                    match decoded {
                        Ok(c) => text.push(c),
                        Err(_) => anomalies += 1,
                    }
                }
            }
        }

        let lines = text
            .split_terminator('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();

        DecodedLines { lines, anomalies }
    }
}

impl fmt::Display for LogEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => write!(f, "utf8"),
            Self::Utf16Le => write!(f, "utf16le"),
        }
    }
}

impl FromStr for LogEncoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "utf16le" | "utf-16le" | "utf16" | "ucs2" => Ok(Self::Utf16Le),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}
