// SPDX-License-Identifier: MIT

//! Time utilities for directory-entry timestamps.
//!
//! Functions:
//! - `local_offset()` → host UTC offset, UTC when it cannot be determined
//! - `systemtime_to_local()` → conversion helper used by the encoder

use std::time::SystemTime;

use time::{OffsetDateTime, UtcOffset};

/// Returns the host's current UTC offset.
///
/// `time` refuses to read the local offset while other threads may be
/// mutating the environment; in that case (and on any other failure) this
/// falls back to UTC.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Converts a [`SystemTime`] into wall-clock time at `offset`.
pub fn systemtime_to_local(t: SystemTime, offset: UtcOffset) -> OffsetDateTime {
    OffsetDateTime::from(t).to_offset(offset)
}
