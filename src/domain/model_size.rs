// ============================================================
// Layer 3 — Model Size Class
// ============================================================
// The single architectural knob exposed to the user. It picks
// how many blocks each mid-size block group stacks.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Small,
    #[default]
    Medium,
    Big,
}

impl ModelSize {
    /// Number of stacked blocks in the 32×32, 16×16 and 7×7 groups
    pub fn layers(self) -> usize {
        match self {
            ModelSize::Small  => 2,
            ModelSize::Medium => 3,
            ModelSize::Big    => 4,
        }
    }
}

impl FromStr for ModelSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small"  => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "big"    => Ok(ModelSize::Big),
            other    => bail!("unknown model size '{other}', expected small, medium or big"),
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelSize::Small  => "small",
            ModelSize::Medium => "medium",
            ModelSize::Big    => "big",
        };
        f.write_str(name)
    }
}
