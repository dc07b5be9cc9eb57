// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timestamps stored on user documents.

use chrono::{DateTime, SecondsFormat, Utc};

/// RFC3339 with a `Z` suffix and whole seconds, e.g. `2026-01-01T00:00:00Z`.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time for `created_at` / `updated_at`.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}
