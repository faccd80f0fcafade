//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation` — failed cache store operation: "get", "set" or "delete"
//! - `outcome` — how a test session ended (see [`SessionOutcome`](crate::bridge::SessionOutcome))
//! - `status` — outcome: "ok" or "error"

/// Total read-through cache hits.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total read-through cache misses (including GET failures treated as misses).
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total cache store failures. Never surfaced to callers.
///
/// Labels: `operation` ("get" | "set" | "delete").
pub const CACHE_ERRORS_TOTAL: &str = "huginn_cache_errors_total";

/// Total keys handed to the invalidation publisher.
pub const INVALIDATED_KEYS_TOTAL: &str = "huginn_invalidated_keys_total";

/// Total invalidation batches whose store deletion failed.
pub const INVALIDATION_FAILURES_TOTAL: &str = "huginn_invalidation_failures_total";

/// Total prompt-test sessions, by how they ended.
///
/// Labels: `outcome`.
pub const SESSIONS_TOTAL: &str = "huginn_sessions_total";

/// Prompt-test session duration in seconds.
///
/// Labels: `outcome`.
pub const SESSION_DURATION_SECONDS: &str = "huginn_session_duration_seconds";

/// Total result frames written to clients.
pub const FRAMES_SENT_TOTAL: &str = "huginn_frames_sent_total";

/// Total transcript recording attempts.
///
/// Labels: `status` ("ok" | "error").
pub const TRANSCRIPTS_RECORDED_TOTAL: &str = "huginn_transcripts_recorded_total";
