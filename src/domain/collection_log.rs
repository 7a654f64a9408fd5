use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::CardId;

/// Source tag written for detail-page fetch attempts
pub const DETAIL_PAGE_SOURCE: &str = "card_detail_page";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Error,
}

impl LogStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// One immutable audit row per detail-fetch attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionLogEntry {
    pub card_id: CardId,
    pub status: LogStatus,
    pub source: String,
    pub error_message: Option<String>,
    pub processing_time_ms: i64,
    pub logged_at: DateTime<Utc>,
}

impl CollectionLogEntry {
    pub fn success(card_id: CardId, processing_time_ms: i64) -> Self {
        Self {
            card_id,
            status: LogStatus::Success,
            source: DETAIL_PAGE_SOURCE.to_string(),
            error_message: None,
            processing_time_ms,
            logged_at: Utc::now(),
        }
    }

    pub fn failure(card_id: CardId, error_message: impl Into<String>, processing_time_ms: i64) -> Self {
        Self {
            card_id,
            status: LogStatus::Error,
            source: DETAIL_PAGE_SOURCE.to_string(),
            error_message: Some(error_message.into()),
            processing_time_ms,
            logged_at: Utc::now(),
        }
    }
}
