//! Confirmation payload for write endpoints.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Confirmation {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Confirmation {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            id: None,
        }
    }

    pub fn with_id(message: &str, id: i64) -> Self {
        Self {
            message: message.to_string(),
            id: Some(id),
        }
    }
}
