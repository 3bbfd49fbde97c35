use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Total length of a well-formed plot code.
pub const CODE_LEN: usize = 14;
/// Length of the shared base prefix.
pub const BASE_LEN: usize = 12;
/// Width of the zero-padded numeric suffix.
pub const SUFFIX_WIDTH: usize = CODE_LEN - BASE_LEN;
/// Exclusive upper bound of the suffix range (suffixes run 0..=99).
pub const SUFFIX_LIMIT: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("plot code '{code}' has length {len}, expected {CODE_LEN}")]
    Length { code: String, len: usize },

    #[error("plot code '{0}' has a non-numeric suffix")]
    Suffix(String),

    #[error("code base '{base}' has length {len}, expected {BASE_LEN}")]
    BaseLength { base: String, len: usize },

    #[error("suffix {0} is outside 0..{SUFFIX_LIMIT}")]
    SuffixRange(u8),
}

/// The 12-character prefix shared by a family of plots in one project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodeBase(String);

impl CodeBase {
    pub fn parse(raw: &str) -> Result<Self, CodeError> {
        let raw = raw.trim();
        // Byte length is only meaningful for ASCII; reject anything else up front.
        if raw.len() != BASE_LEN || !raw.is_ascii() {
            return Err(CodeError::BaseLength {
                base: raw.to_string(),
                len: raw.chars().count(),
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the code for `suffix` under this base.
    pub fn with_suffix(&self, suffix: u8) -> Result<PlotCode, CodeError> {
        if suffix >= SUFFIX_LIMIT {
            return Err(CodeError::SuffixRange(suffix));
        }
        Ok(PlotCode {
            raw: format!("{}{:0width$}", self.0, suffix, width = SUFFIX_WIDTH),
            suffix,
        })
    }
}

impl std::fmt::Display for CodeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A well-formed plot code: base + two-digit suffix.
///
/// Raw strings reported by remote services are plain `String`s until they
/// pass [`PlotCode::parse`]; only parsed codes may seed the code-space search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlotCode {
    raw: String,
    suffix: u8,
}

impl PlotCode {
    pub fn parse(raw: &str) -> Result<Self, CodeError> {
        if raw.len() != CODE_LEN || !raw.is_ascii() {
            return Err(CodeError::Length {
                code: raw.to_string(),
                len: raw.chars().count(),
            });
        }

        let tail = &raw[BASE_LEN..];
        if !tail.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodeError::Suffix(raw.to_string()));
        }

        let suffix = tail
            .parse::<u8>()
            .map_err(|_| CodeError::Suffix(raw.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            suffix,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn base(&self) -> CodeBase {
        CodeBase(self.raw[..BASE_LEN].to_string())
    }

    pub fn suffix(&self) -> u8 {
        self.suffix
    }

    /// Split into `(base, suffix)`.
    pub fn decompose(&self) -> (CodeBase, u8) {
        (self.base(), self.suffix)
    }
}

impl std::fmt::Display for PlotCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for PlotCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
