use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::aggregate::Aggregator;
use crate::error::SizeError;
use crate::topology::WorkflowType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: Value,
}

impl Response {
    pub fn ok(body: Value) -> Self {
        Self { status_code: 200, body }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_error(400, message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_error(500, message.into())
    }

    fn with_error(status_code: u16, message: String) -> Self {
        Self { status_code, body: json!({ "error": message }) }
    }
}

impl From<&SizeError> for Response {
    fn from(err: &SizeError) -> Self {
        Response::with_error(err.status_code(), err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSizeRequest {
    pub task_id: Option<String>,
    pub workflow_type: String,
}

impl DataSizeRequest {
    pub fn new(task_id: impl Into<String>, workflow: WorkflowType) -> Self {
        Self { task_id: Some(task_id.into()), workflow_type: workflow.as_str().to_string() }
    }

    /// `task_id` (or `TaskId`) and `workflow_type`, defaulting to `frame_based`
    /// only when the key is absent.
    pub fn from_event(event: &Value) -> Self {
        let task_id = ["task_id", "TaskId"]
            .iter()
            .filter_map(|k| match event.get(*k)? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .next();
        // 문자열이 아닌 값은 JSON 텍스트 그대로 넘겨서 UnknownWorkflow 로 거절
        let workflow_type = match event.get("workflow_type") {
            None => WorkflowType::default().as_str().to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        Self { task_id, workflow_type }
    }
}

pub async fn get_data_size(aggregator: &Aggregator, request: DataSizeRequest) -> Response {
    info!(task_id = ?request.task_id, workflow = %request.workflow_type, "get data size");

    let result = match aggregator
        .aggregate(request.task_id.as_deref(), &request.workflow_type)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            if e.status_code() >= 500 {
                error!(error = %e, "data size request failed");
            } else {
                warn!(error = %e, "data size request rejected");
            }
            return Response::from(&e);
        }
    };

    let mut body = match serde_json::to_value(&result) {
        Ok(v) => v,
        Err(e) => return Response::from(&SizeError::Internal(e.to_string())),
    };
    let settings = aggregator.settings();
    body["bucket"] = json!(settings.bucket.as_deref().unwrap_or_default());
    body["region"] = json!(settings.region);
    Response::ok(body)
}
