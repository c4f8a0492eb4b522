use serde::{Deserialize, Serialize};

pub const SURVEY_TABLE: &str = "typeform_responses";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

pub const SUBMITTED_AT_COLUMN: &str = "submitted_at";
pub const RESPONSE_ID_COLUMN: &str = "response_id";

/// One page of `GET /forms/{form_id}/responses`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsePage {
    #[serde(default)]
    pub total_items: Option<u64>,
    #[serde(default)]
    pub page_count: Option<u64>,
    pub items: Vec<FormResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormResponse {
    pub response_id: String,
    pub submitted_at: String,
    #[serde(default)]
    pub answers: Option<Vec<Answer>>,
}

impl FormResponse {
    pub fn answers(&self) -> &[Answer] {
        self.answers.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerField {
    pub id: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
}

/// A single answer. The value lives under the key named by `kind`
/// (`"text"`, `"number"`, `"choice"`, ...), so everything besides `field`
/// and `type` is kept in `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub field: AnswerField,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Answer {
    pub fn question_id(&self) -> &str {
        &self.field.id
    }

    pub fn value(&self) -> Option<&serde_json::Value> {
        self.payload.get(&self.kind)
    }
}
