//! Log pulling for `/log`
//!
//! The scheduler pulls execution logs page by page. Content is delegated to
//! a user-supplied log handler; without one, a benign "no log" page is
//! served so the scheduler UI renders cleanly.

use std::sync::Arc;

use shared::api::{LogReq, LogRes, LogResContent, SUCCESS_CODE};

/// User-supplied function serving one log page per request.
pub type LogHandler = Arc<dyn Fn(&LogReq) -> LogRes + Send + Sync>;

/// Response served when no log handler is installed.
pub fn default_log_response(req: &LogReq) -> LogRes {
    LogRes {
        code: SUCCESS_CODE,
        msg: String::new(),
        content: LogResContent {
            from_line_num: req.from_line_num,
            to_line_num: 0,
            log_content: "log handler not configured".to_string(),
            is_end: true,
        },
    }
}
