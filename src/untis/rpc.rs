//! JSON-RPC envelopes as spoken by WebUntis

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// JSON-RPC error code for an unknown method
pub const METHOD_NOT_FOUND: i64 = -32601;

/// How many characters of an unexpected body are kept in error messages
const BODY_EXCERPT_LEN: usize = 500;

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: &'static str,
    pub method: &'a str,
    pub jsonrpc: &'static str,
    pub params: Value,
}

impl<'a> Request<'a> {
    pub fn new(method: &'a str, params: Value) -> Self {
        Self { id: "id", method, jsonrpc: "2.0", params }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)?;
        if let Some(data) = &self.data {
            write!(f, " {}", data)?;
        }
        Ok(())
    }
}

/// What a JSON-RPC call came back with
#[derive(Debug, PartialEq)]
pub enum RpcOutcome {
    Success(Value),
    /// The server does not know this method (e.g. it only speaks an older API)
    MethodNotFound(RpcError),
    Failed(RpcError),
}

impl RpcOutcome {
    /// Interpret a raw response body
    pub fn from_body(body: &str) -> Result<Self> {
        let mut response: Value = serde_json::from_str(body).map_err(|err| {
            Error::SourceProtocol(format!("no valid JSON response ({}): {}", err, excerpt(body)))
        })?;

        if let Some(error) = response.get_mut("error").map(Value::take).filter(|error| error.is_null() == false) {
            let error: RpcError = serde_json::from_value(error)
                .map_err(|err| Error::SourceProtocol(format!("invalid error object ({}): {}", err, excerpt(body))))?;
            if error.code == METHOD_NOT_FOUND {
                return Ok(RpcOutcome::MethodNotFound(error));
            }
            return Ok(RpcOutcome::Failed(error));
        }

        // `null` is a valid result (e.g. for `logout`)
        match response.get_mut("result").map(Value::take) {
            Some(result) => Ok(RpcOutcome::Success(result)),
            None => Err(Error::SourceProtocol(format!("response has neither a result nor an error: {}", excerpt(body)))),
        }
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_and_errors_are_told_apart() {
        let ok = RpcOutcome::from_body(r#"{"jsonrpc":"2.0","id":"id","result":{"sessionId":"ABC"}}"#).unwrap();
        assert_eq!(ok, RpcOutcome::Success(json!({"sessionId": "ABC"})));

        let unknown = RpcOutcome::from_body(r#"{"jsonrpc":"2.0","id":"id","error":{"code":-32601,"message":"Method not found"}}"#).unwrap();
        assert!(matches!(unknown, RpcOutcome::MethodNotFound(_)));

        let failed = RpcOutcome::from_body(r#"{"jsonrpc":"2.0","id":"id","error":{"code":-8504,"message":"bad credentials"}}"#).unwrap();
        match failed {
            RpcOutcome::Failed(err) => assert_eq!(err.to_string(), "bad credentials (code -8504)"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn non_json_bodies_are_protocol_errors() {
        let body = format!("<html>{}</html>", "x".repeat(2000));
        match RpcOutcome::from_body(&body) {
            Err(Error::SourceProtocol(msg)) => {
                assert!(msg.contains("<html>"));
                assert!(msg.len() < 700);
            },
            other => panic!("unexpected outcome {:?}", other),
        }

        assert!(matches!(RpcOutcome::from_body(r#"{"jsonrpc":"2.0"}"#), Err(Error::SourceProtocol(_))));
        assert!(matches!(RpcOutcome::from_body("[1, 2]"), Err(Error::SourceProtocol(_))));
    }

    #[test]
    fn null_results_are_successes() {
        let outcome = RpcOutcome::from_body(r#"{"jsonrpc":"2.0","id":"id","result":null}"#).unwrap();
        assert_eq!(outcome, RpcOutcome::Success(Value::Null));
    }

    #[test]
    fn requests_are_serialized_as_json_rpc() {
        let request = Request::new("getUserData", json!({}));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"id": "id", "method": "getUserData", "jsonrpc": "2.0", "params": {}}));
    }
}
