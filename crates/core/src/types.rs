/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Monotonic identifier assigned to each outgoing vitals fetch.
pub type FetchSeq = u64;

/// Generation counter used to tell a live timer fire from a superseded one.
pub type TimerGeneration = u64;
