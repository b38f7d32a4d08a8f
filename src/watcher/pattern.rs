//! Line classification for installer logs.
//!
//! Each line is tested against an ordered list of recognizers and the
//! first match decides the outcome. Classification is stateless: the
//! result for a line never depends on the lines before it.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outcome a recognizer reports when it matches.
///
/// Ordered by precedence: errors are checked before failures, failures
/// before successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The installer hit an internal error.
    Error,
    /// The installer finished without installing.
    Failure,
    /// The installer finished successfully.
    Success,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Failure => write!(f, "failure"),
            Self::Success => write!(f, "success"),
        }
    }
}

/// Classification of a single log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Classification {
    /// Nothing recognized.
    #[default]
    None,
    Error(Option<String>),
    Failure(Option<String>),
    Success(Option<String>),
}

impl Classification {
    fn from_verdict(verdict: Verdict, detail: Option<String>) -> Self {
        match verdict {
            Verdict::Error => Self::Error(detail),
            Verdict::Failure => Self::Failure(detail),
            Verdict::Success => Self::Success(detail),
        }
    }

    /// Get the verdict, or `None` for an unrecognized line.
    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Self::None => None,
            Self::Error(_) => Some(Verdict::Error),
            Self::Failure(_) => Some(Verdict::Failure),
            Self::Success(_) => Some(Verdict::Success),
        }
    }

    /// Get the detail extracted from the matching line.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Error(d) | Self::Failure(d) | Self::Success(d) => d.as_deref(),
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Error type for recognizer construction.
#[derive(thiserror::Error, Debug)]
pub enum PatternError {
    /// Invalid regex pattern.
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// A single recognizer: a pattern paired with the verdict it reports.
///
/// If the pattern has a capture group named `detail`, its trimmed text is
/// attached to the classification.
#[derive(Debug, Clone)]
pub struct Recognizer {
    verdict: Verdict,
    pattern: Regex,
    description: String,
}

impl Recognizer {
    /// Create a new recognizer.
    ///
    /// # Errors
    ///
    /// Returns `PatternError::InvalidPattern` if the regex is invalid.
    pub fn new(
        verdict: Verdict,
        pattern: &str,
        description: impl Into<String>,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            verdict,
            pattern: Regex::new(pattern)?,
            description: description.into(),
        })
    }

    /// Classify `line`, returning `None` if the pattern does not match.
    #[must_use]
    pub fn recognize(&self, line: &str) -> Option<Classification> {
        let captures = self.pattern.captures(line)?;
        let detail = captures
            .name("detail")
            .map(|m| m.as_str().trim())
            .filter(|d| !d.is_empty())
            .map(String::from);
        Some(Classification::from_verdict(self.verdict, detail))
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the pattern string (for debugging/display).
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

type BuiltinRule = (Verdict, &'static str, &'static str);

const GENERIC_RULES: &[BuiltinRule] = &[
    (Verdict::Error, r"\[ERROR\]\s*(?P<detail>.*)", "explicit error marker"),
    (
        Verdict::Failure,
        r"\[FAIL(?:URE|ED)?\]\s*(?P<detail>.*)",
        "explicit failure marker",
    ),
    (
        Verdict::Success,
        r"\[SUCCESS\].*?\binstalled (?:at|to|in)\s+(?P<detail>.+)$",
        "success marker with install path",
    ),
    (Verdict::Success, r"\[SUCCESS\]\s*(?P<detail>.*)", "success marker"),
];

// Burn bootstrapper log (Visual Studio Build Tools), UTF-8.
const BUILD_TOOLS_RULES: &[BuiltinRule] = &[
    (
        Verdict::Error,
        r"(?i)\bfatal error\b[:\s]*(?P<detail>.*)",
        "bootstrapper fatal error",
    ),
    (
        Verdict::Error,
        r"Unhandled exception[:\s]*(?P<detail>.*)",
        "bootstrapper crashed",
    ),
    (
        Verdict::Failure,
        r"Apply complete, result: (?P<detail>0x[1-9a-fA-F][0-9a-fA-F]*)",
        "apply phase failed",
    ),
    (
        Verdict::Failure,
        r"Shutting down, exit code: (?P<detail>0x[1-9a-fA-F][0-9a-fA-F]*)",
        "bootstrapper exited with error code",
    ),
    (Verdict::Success, r"Variable: IsInstalled = 1", "bundle installed"),
    (
        Verdict::Success,
        r"Setting string variable 'IsInstalled' to value '1'",
        "bundle installed",
    ),
    (Verdict::Success, r"WixBundleInstalled = 1", "bundle installed"),
    (
        Verdict::Success,
        r"Apply complete, result: 0x0\b",
        "apply phase succeeded",
    ),
];

// msiexec verbose log (Python), UTF-16LE.
const PYTHON_RULES: &[BuiltinRule] = &[
    (
        Verdict::Error,
        r"Internal Error (?P<detail>2\d{3})",
        "windows installer internal error",
    ),
    (
        Verdict::Failure,
        r"-- Installation (?:operation )?failed",
        "product installation failed",
    ),
    (
        Verdict::Failure,
        r"Installation success or error status: (?P<detail>[1-9]\d*)",
        "installer returned error status",
    ),
    (
        Verdict::Failure,
        r"Action ended .*: INSTALL\. Return value 3",
        "install action failed",
    ),
    (
        Verdict::Success,
        r"-- Installation (?:operation )?completed successfully",
        "product installed",
    ),
    (
        Verdict::Success,
        r"Installation success or error status: 0\b",
        "installer returned success status",
    ),
];

/// An ordered collection of recognizers.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    recognizers: Vec<Recognizer>,
}

impl Classifier {
    /// Create an empty classifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            recognizers: Vec::new(),
        }
    }

    /// Recognizes `[ERROR]`, `[FAILURE]` and `[SUCCESS]` markers.
    #[must_use]
    pub fn generic() -> Self {
        Self::from_builtin(GENERIC_RULES)
    }

    /// Recognizes outcomes in a Burn bootstrapper log.
    #[must_use]
    pub fn build_tools() -> Self {
        Self::from_builtin(BUILD_TOOLS_RULES)
    }

    /// Recognizes outcomes in an msiexec verbose log.
    #[must_use]
    pub fn python() -> Self {
        Self::from_builtin(PYTHON_RULES)
    }

    fn from_builtin(rules: &[BuiltinRule]) -> Self {
        let recognizers = rules
            .iter()
            .filter_map(|&(verdict, pattern, description)| {
                match Recognizer::new(verdict, pattern, description) {
                    Ok(r) => Some(r),
                    Err(e) => {
                        tracing::warn!(error = %e, pattern, "Failed to compile built-in recognizer");
                        None
                    }
                }
            })
            .collect();
        Self { recognizers }
    }

    /// Append a recognizer after the existing ones.
    pub fn push(&mut self, recognizer: Recognizer) {
        self.recognizers.push(recognizer);
    }

    /// Append recognizers, then restore error/failure/success precedence.
    ///
    /// The sort is stable, so recognizers sharing a verdict keep their
    /// relative order.
    pub fn extend_ordered(&mut self, recognizers: impl IntoIterator<Item = Recognizer>) {
        self.recognizers.extend(recognizers);
        self.recognizers.sort_by_key(Recognizer::verdict);
    }

    #[must_use]
    pub fn recognizers(&self) -> &[Recognizer] {
        &self.recognizers
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recognizers.is_empty()
    }

    /// Classify one line. The first matching recognizer wins.
    #[must_use]
    pub fn classify(&self, line: &str) -> Classification {
        self.recognizers
            .iter()
            .find_map(|r| r.recognize(line))
            .unwrap_or_default()
    }
}
