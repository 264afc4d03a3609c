//! Shared primitive types used across the crate.

use chrono::{DateTime, Utc};

/// Store-assigned identity of a persisted scenario.
pub type RecordId = i64;

/// Wall-clock instant, always UTC.
pub type Timestamp = DateTime<Utc>;
