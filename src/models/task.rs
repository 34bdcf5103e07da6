use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scheduled reminder. Stored as a JSON array under `tasks:<chat_id>`,
/// kept sorted by `time_iso`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub time_iso: DateTime<Utc>,
    pub name: String,

    #[serde(flatten)]
    pub kind: TaskKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskKind {
    Simple,
    Alpha {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<f64>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        contract: Option<String>,
    },
}

impl Task {
    pub fn simple(time_iso: DateTime<Utc>, name: impl Into<String>) -> Self {
        Self {
            time_iso,
            name: name.into(),
            kind: TaskKind::Simple,
        }
    }

    pub fn is_alpha(&self) -> bool {
        matches!(self.kind, TaskKind::Alpha { .. })
    }

    /// Key fragment used for per-task delivery markers.
    pub fn time_key(&self) -> String {
        self.time_iso.to_rfc3339()
    }
}
