//! Wire types for the scheduler protocol
//!
//! This module defines the JSON message shapes exchanged between the central
//! scheduler and the executor: dispatch requests received on the executor's
//! HTTP surface, and the registry/callback payloads the executor POSTs back.
//! Field names follow the scheduler's wire format exactly (camelCase, with
//! the historical `logDateTim` spelling in the log and callback shapes).

use serde::{Deserialize, Serialize};

/// Protocol code for a successful operation
pub const SUCCESS_CODE: i64 = 200;
/// Protocol code for a failed operation
pub const FAILURE_CODE: i64 = 500;
/// Protocol code reported when a task exceeds its dispatch timeout
pub const TIMEOUT_CODE: i64 = 502;

/// HTTP headers used on scheduler calls in both directions
pub mod headers {
    pub const ACCESS_TOKEN: &str = "XXL-JOB-ACCESS-TOKEN";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";
}

/// Endpoint paths on both sides of the protocol
pub mod endpoints {
    // scheduler -> executor
    pub const RUN: &str = "/run";
    pub const KILL: &str = "/kill";
    pub const LOG: &str = "/log";
    pub const BEAT: &str = "/beat";
    pub const IDLE_BEAT: &str = "/idleBeat";

    // executor -> scheduler
    pub const REGISTRY: &str = "/api/registry";
    pub const REGISTRY_REMOVE: &str = "/api/registryRemove";
    pub const CALLBACK: &str = "/api/callback";
}

/// Block strategy applied when a dispatch lands on an occupied job slot.
///
/// The scheduler sends this as a plain string; anything unrecognized (or an
/// absent field) decodes to `Unknown`, which admission treats the same as
/// the rejecting strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BlockStrategy {
    /// Reject while the slot is occupied; the scheduler serializes dispatches
    #[serde(rename = "SERIAL_EXECUTION")]
    SerialExecution,
    /// Reject while the slot is occupied; the scheduler discards the dispatch
    #[serde(rename = "DISCARD_LATER")]
    DiscardLater,
    /// Cancel the occupant and take over the slot
    #[serde(rename = "COVER_EARLY")]
    CoverEarly,
    #[serde(other)]
    #[default]
    Unknown,
}

/// Dispatch request for a single job trigger, received on `/run`.
///
/// Every field defaults when absent: the scheduler omits fields freely
/// depending on job configuration and version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RunReq {
    /// Job definition identifier
    pub job_id: i64,
    /// Name the target handler was registered under
    pub executor_handler: String,
    /// Opaque parameter string passed through to the handler
    pub executor_params: String,
    pub executor_block_strategy: BlockStrategy,
    /// Timeout in seconds; zero or negative means no deadline
    pub executor_timeout: i64,
    /// Identifier of this dispatch occurrence, unique per trigger
    pub log_id: i64,
    /// Trigger time in epoch milliseconds
    pub log_date_time: i64,
    /// Glue fields are carried for protocol completeness; the executor
    /// passes them through without interpreting them
    pub glue_type: String,
    pub glue_source: String,
    pub glue_updatetime: i64,
    /// Shard index of this executor for broadcast jobs
    pub broadcast_index: i64,
    /// Total shard count for broadcast jobs
    pub broadcast_total: i64,
}

/// Kill request received on `/kill`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct KillReq {
    pub job_id: i64,
}

/// Busy-probe request received on `/idleBeat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IdleBeatReq {
    pub job_id: i64,
}

/// Log-page request received on `/log`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LogReq {
    pub log_date_tim: i64,
    pub log_id: i64,
    /// First line the scheduler wants; used for rolling log pagination
    pub from_line_num: i32,
}

/// Response body for `/log`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRes {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub content: LogResContent,
}

/// Log page carried inside a [`LogRes`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LogResContent {
    pub from_line_num: i32,
    pub to_line_num: i32,
    pub log_content: String,
    pub is_end: bool,
}

/// Generic protocol response: `code` 200 means success, anything else failure.
///
/// Used both for the executor's own endpoint replies and for parsing the
/// scheduler's replies to registry/callback POSTs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ApiResponse {
    /// Create a successful protocol response
    pub fn success() -> Self {
        Self {
            code: SUCCESS_CODE,
            msg: None,
        }
    }

    /// Create a failed protocol response with a message
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            code: FAILURE_CODE,
            msg: Some(msg.into()),
        }
    }

    /// Whether the response carries the success code
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

/// Execution outcome of one dispatch, nested inside a [`CallbackParam`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResult {
    pub code: i64,
    pub msg: String,
}

/// One element of the `/api/callback` body.
///
/// `handle_code`/`handle_msg` mirror `execute_result` for newer scheduler
/// versions that read the flat fields instead of the nested object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackParam {
    pub log_id: i64,
    pub log_date_tim: i64,
    pub execute_result: ExecuteResult,
    pub handle_code: i64,
    pub handle_msg: String,
}

impl CallbackParam {
    /// Build a callback element for a dispatch, mirroring the outcome into
    /// both the nested and the flat result fields.
    pub fn from_run_req(req: &RunReq, code: i64, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self {
            log_id: req.log_id,
            log_date_tim: req.log_date_time,
            execute_result: ExecuteResult {
                code,
                msg: msg.clone(),
            },
            handle_code: code,
            handle_msg: msg,
        }
    }
}

/// Build the `/api/callback` body: a single-element array for one dispatch.
pub fn callback_body(req: &RunReq, code: i64, msg: impl Into<String>) -> Vec<CallbackParam> {
    vec![CallbackParam::from_run_req(req, code, msg)]
}

/// Registration payload POSTed to `/api/registry` and `/api/registryRemove`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryParam {
    pub registry_group: String,
    pub registry_key: String,
    pub registry_value: String,
}

impl RegistryParam {
    /// Registration payload for an executor advertising `value` (its base URL)
    /// under the logical name `key`.
    pub fn executor(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            registry_group: "EXECUTOR".to_string(),
            registry_key: key.into(),
            registry_value: value.into(),
        }
    }
}
