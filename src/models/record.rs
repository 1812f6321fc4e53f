use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable metadata for one stored image
///
/// `filename` is the Blob Store key; exactly one live object exists per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    /// Signed, time-limited URL for the blob
    pub url: String,
    pub filename: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; id and timestamps are assigned by the Metadata Store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImageRecord {
    pub url: String,
    pub filename: String,
    pub owner_id: i64,
}

/// Validated page request for owner listings (both values >= 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// Largest page size a listing may ask for
    pub const MAX_LIMIT: u64 = 100;

    /// Rows to skip; the extractor rejects pages whose offset leaves `i64` range
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_is_zero_based() {
        assert_eq!(Pagination { page: 1, limit: 10 }.offset(), 0);
        assert_eq!(Pagination { page: 3, limit: 25 }.offset(), 50);
    }

    #[test]
    fn test_offset_saturates() {
        let huge = Pagination {
            page: u64::MAX,
            limit: u64::MAX,
        };
        assert_eq!(huge.offset(), u64::MAX);
    }

    #[test]
    fn test_record_serializes_snake_case() {
        let now = Utc::now();
        let record = ImageRecord {
            id: 5,
            url: "http://localhost/blobs/uploaded_cat.jpg".to_string(),
            filename: "uploaded_cat.jpg".to_string(),
            owner_id: 1,
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["owner_id"], 1);
        assert_eq!(value["filename"], "uploaded_cat.jpg");

        let back: ImageRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
