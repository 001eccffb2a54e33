use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation/modification stamps carried by every persisted entity.
///
/// Both fields are optional: entities written by older directory layouts
/// have neither, and the timestamp listener only back-fills them on the
/// next mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<DateTime<Utc>>,
}

impl Metadata {
    pub fn created_now() -> Self {
        Self {
            date_created: Some(Utc::now()),
            date_modified: None,
        }
    }

    pub fn touch(&mut self) {
        self.date_modified = Some(Utc::now());
    }
}
