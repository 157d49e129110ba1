//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent between the executor, the
//! registries and the engine, and let tests assert on captured events.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Pipeline identifiers
pub const FIELD_DATASET: &str = "dataset";
pub const FIELD_VERSION: &str = "version";
pub const FIELD_STAGE: &str = "stage";
pub const FIELD_LOCATION: &str = "location";

// Row counts
pub const FIELD_ROWS_IN: &str = "rows_in";
pub const FIELD_ROWS_OUT: &str = "rows_out";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Canonical op names
pub const OP_COLLECT: &str = "collect";
pub const OP_SHOW: &str = "show";
pub const OP_SAVE: &str = "save";
pub const OP_LOAD: &str = "load";
pub const OP_INGEST: &str = "ingest";
pub const OP_LIST_DATASETS: &str = "list_datasets";
pub const OP_LIST_VERSIONS: &str = "list_versions";
pub const OP_LIST_FILES: &str = "list_files";
