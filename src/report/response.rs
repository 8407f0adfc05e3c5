use crate::report::RunResult;
use crate::CrawlError;
use serde::Serialize;
use serde_json::{json, Value};

/// Status-coded response of one invocation
///
/// Serialized as `{"statusCode": 200, "body": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: Value,
}

impl InvocationResponse {
    pub fn from_outcome(outcome: &Result<RunResult, CrawlError>) -> Self {
        match outcome {
            Ok(result) => Self {
                status_code: 200,
                body: json!({ "success": true, "result": result }),
            },
            Err(err) => Self::from_error(err),
        }
    }

    pub fn from_error(err: &CrawlError) -> Self {
        let message = err.to_string();
        match err {
            CrawlError::InvalidConfiguration(_) => Self {
                status_code: 400,
                body: json!({
                    "success": false,
                    "error": message,
                    "supportedTypes": ["daily", "quarter", "annual"],
                }),
            },
            CrawlError::Export { tally, .. } => Self {
                status_code: 500,
                body: json!({ "success": false, "error": message, "tally": tally }),
            },
            CrawlError::SessionLaunch(_) | CrawlError::Cancelled { .. } => Self {
                status_code: 500,
                body: json!({ "success": false, "error": message }),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}
