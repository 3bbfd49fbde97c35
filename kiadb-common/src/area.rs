use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AreaError {
    #[error("area name '{0}' must look like <district>-<industrial_area>")]
    MissingSeparator(String),

    #[error("area name '{0}' has an empty district or industrial area")]
    EmptyPart(String),
}

/// One industrial area inside a district.
///
/// Names are kept in their underscored file-name form; the status listing is
/// queried with both the spaced and the underscored spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Area {
    district: String,
    industrial_area: String,
}

impl Area {
    pub fn new(district: impl Into<String>, industrial_area: impl Into<String>) -> Self {
        Self {
            district: district.into(),
            industrial_area: industrial_area.into(),
        }
    }

    /// Parse `Bengaluru_Urban-Peenya_Industrial_Area` style stems (split on the first `-`).
    pub fn from_stem(stem: &str) -> Result<Self, AreaError> {
        let (district, area) = stem
            .split_once('-')
            .ok_or_else(|| AreaError::MissingSeparator(stem.to_string()))?;
        if district.is_empty() || area.is_empty() {
            return Err(AreaError::EmptyPart(stem.to_string()));
        }
        Ok(Self::new(district, area))
    }

    /// The stem this area was parsed from; used to name output files.
    pub fn stem(&self) -> String {
        format!("{}-{}", self.district, self.industrial_area)
    }

    pub fn district(&self) -> String {
        self.district.replace('_', " ")
    }

    pub fn industrial_area(&self) -> String {
        self.industrial_area.replace('_', " ")
    }

    /// `(district, industrial_area)` spellings to try against the status listing, in order.
    pub fn key_spellings(&self) -> [(String, String); 2] {
        [
            (self.district(), self.industrial_area()),
            (self.district.clone(), self.industrial_area.clone()),
        ]
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.district(), self.industrial_area())
    }
}
