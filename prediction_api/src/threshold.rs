use serde::{Deserialize, Serialize};
use std::fmt;

pub const CANCER_SUGGESTION: &str = "Segera periksa ke dokter!";
pub const NON_CANCER_SUGGESTION: &str = "Penyakit kanker tidak terdeteksi.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Cancer")]
    Cancer,
    #[serde(rename = "Non-cancer")]
    NonCancer,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Cancer => "Cancer",
            Label::NonCancer => "Non-cancer",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a classifier confidence score to a label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdPolicy {
    /// `score > cutoff` is `Cancer`, anything else is `Non-cancer`.
    BinaryCutoff { cutoff: f32 },
    /// Compares `score * 100` against `cutoff`. A score landing exactly on
    /// the cutoff has no label.
    PercentageCutoff { cutoff: f32 },
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::BinaryCutoff { cutoff: 0.5 }
    }
}

impl ThresholdPolicy {
    pub fn classify(&self, score: f32) -> Option<Label> {
        match *self {
            ThresholdPolicy::BinaryCutoff { cutoff } => {
                if score > cutoff {
                    Some(Label::Cancer)
                } else {
                    Some(Label::NonCancer)
                }
            }
            ThresholdPolicy::PercentageCutoff { cutoff } => {
                let percent = score * 100.0;
                if percent > cutoff {
                    Some(Label::Cancer)
                } else if percent < cutoff {
                    Some(Label::NonCancer)
                } else {
                    None
                }
            }
        }
    }
}

/// An indeterminate result gets the "not detected" text as well.
pub fn suggestion_for(label: Option<Label>) -> &'static str {
    match label {
        Some(Label::Cancer) => CANCER_SUGGESTION,
        Some(Label::NonCancer) | None => NON_CANCER_SUGGESTION,
    }
}
