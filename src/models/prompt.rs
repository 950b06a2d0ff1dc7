//! Prompt library entry. Seeded exogenously; read-only to the engine
//! apart from the usage counter.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub prompt_id: Uuid,
    pub text: String,
    pub category: Option<String>,
    pub enabled: bool,
    pub usage_count: u64,
}

impl Prompt {
    pub fn new(text: impl Into<String>, category: Option<String>) -> Self {
        Self {
            prompt_id: Uuid::new_v4(),
            text: text.into(),
            category,
            enabled: true,
            usage_count: 0,
        }
    }
}
