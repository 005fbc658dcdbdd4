use crate::error::RpcError;
use crate::types::Params;

#[derive(serde::Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    pub(super) jsonrpc: &'static str,
    pub(super) id: u64,
    pub(super) method: &'a str,
    pub(super) params: &'a Params,
}

#[derive(serde::Deserialize)]
pub(super) struct JsonRpcResponse {
    #[serde(default)]
    pub(super) id: Option<serde_json::Value>,
    pub(super) result: Option<serde_json::Value>,
    pub(super) error: Option<serde_json::Value>,
}

/// Parse a JSON-RPC error value into a structured `RpcError`.
///
/// JSON-RPC 2.0 errors have the shape `{"code": <int>, "message": <string>}`.
/// If the error value matches that shape, we produce a `ServerError`;
/// otherwise we fall back to `InvalidResponse` with the raw JSON.
pub(super) fn parse_jsonrpc_error(err: serde_json::Value) -> RpcError {
    #[derive(serde::Deserialize)]
    struct JsonRpcError {
        code: i64,
        message: String,
    }

    match serde_json::from_value::<JsonRpcError>(err.clone()) {
        Ok(parsed) => RpcError::ServerError {
            code: parsed.code,
            message: parsed.message,
        },
        Err(_) => RpcError::InvalidResponse(format!("non-standard JSON-RPC error: {err}")),
    }
}

/// Check that a response answers the request it was read for.
pub(super) fn check_response_id(
    expected: u64,
    id: Option<&serde_json::Value>,
) -> Result<(), RpcError> {
    let Some(id) = id.filter(|id| !id.is_null()) else {
        return Ok(());
    };

    let parsed = match (id.as_u64(), id.as_str()) {
        (Some(n), _) => Some(n),
        (None, Some(s)) => s.parse::<u64>().ok(),
        (None, None) => None,
    };
    match parsed {
        Some(n) if n == expected => Ok(()),
        _ => Err(RpcError::InvalidResponse(format!(
            "response id {id} does not match request id {expected}"
        ))),
    }
}
