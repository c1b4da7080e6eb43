use crate::threshold::{suggestion_for, Label};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted prediction. Written once per successful request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: Uuid,
    pub result: Option<Label>,
    pub suggestion: String,
    pub created_at: String,
}

impl PredictionRecord {
    pub fn new(result: Option<Label>) -> Self {
        Self {
            id: Uuid::new_v4(),
            result,
            suggestion: suggestion_for(result).to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
