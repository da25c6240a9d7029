/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Record identifiers are opaque TEXT keys issued by the system of record.
pub type RecordId = String;
