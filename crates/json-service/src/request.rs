use serde_json::{Map, Value};

use crate::error::ServiceError;
use crate::types::{JsonRpcVersion, RequestId};

/// Parameters for a request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

/// A request object as read off the wire.
///
/// `jsonrpc` is optional and `id` may be absent (a notification). Both shapes
/// are dispatched the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub version: Option<JsonRpcVersion>,
    pub method: String,
    pub params: Option<RequestParams>,
    pub id: Option<RequestId>,
}

impl RequestEnvelope {
    /// Read a request from a JSON object, validating member shapes
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, ServiceError> {
        let version = match object.get("jsonrpc") {
            None | Some(Value::Null) => None,
            Some(Value::String(v)) if v == crate::JSONRPC_VERSION => Some(JsonRpcVersion::V2_0),
            Some(other) => {
                return Err(ServiceError::InvalidRequest(format!(
                    "unsupported jsonrpc version {}",
                    other
                )));
            }
        };

        let method = match object.get("method") {
            Some(Value::String(method)) => method.clone(),
            Some(_) => {
                return Err(ServiceError::InvalidRequest(
                    "'method' must be a string".to_string(),
                ));
            }
            None => {
                return Err(ServiceError::InvalidRequest(
                    "missing 'method' member".to_string(),
                ));
            }
        };

        let params = match object.get("params") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(RequestParams::Array(items.clone())),
            Some(Value::Object(map)) => Some(RequestParams::Object(map.clone())),
            Some(_) => {
                return Err(ServiceError::InvalidRequest(
                    "'params' must be an array or an object".to_string(),
                ));
            }
        };

        Ok(Self {
            version,
            method,
            params,
            id: object.get("id").and_then(RequestId::from_value),
        })
    }

    /// A request without an id
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_request_without_params_or_id() {
        let request = RequestEnvelope::from_object(&object(json!({"method": "ping"}))).unwrap();
        assert_eq!(request.method, "ping");
        assert!(request.params.is_none());
        assert!(request.is_notification());
        assert!(request.version.is_none());
    }

    #[test]
    fn test_request_with_array_params() {
        let request = RequestEnvelope::from_object(&object(
            json!({"jsonrpc": "2.0", "method": "add", "params": [2, 3], "id": 9}),
        ))
        .unwrap();

        assert_eq!(request.version, Some(JsonRpcVersion::V2_0));
        assert_eq!(request.params, Some(RequestParams::Array(vec![json!(2), json!(3)])));
        assert_eq!(request.id, Some(RequestId::from(9)));
        assert!(!request.is_notification());
    }

    #[test]
    fn test_request_with_object_params() {
        let request = RequestEnvelope::from_object(&object(
            json!({"method": "greet", "params": {"name": "ada"}, "id": "r1"}),
        ))
        .unwrap();

        match request.params {
            Some(RequestParams::Object(map)) => assert_eq!(map.get("name"), Some(&json!("ada"))),
            other => panic!("expected named params, got {:?}", other),
        }
        assert_eq!(request.id, Some(RequestId::from("r1")));
    }

    #[test]
    fn test_rejects_malformed_members() {
        assert!(RequestEnvelope::from_object(&object(json!({"params": []}))).is_err());
        assert!(RequestEnvelope::from_object(&object(json!({"method": 4}))).is_err());
        assert!(
            RequestEnvelope::from_object(&object(json!({"method": "a", "params": 1}))).is_err()
        );
        assert!(
            RequestEnvelope::from_object(&object(json!({"jsonrpc": "1.0", "method": "a"})))
                .is_err()
        );
    }

    #[test]
    fn test_null_params_means_no_params() {
        let request =
            RequestEnvelope::from_object(&object(json!({"method": "a", "params": null}))).unwrap();
        assert!(request.params.is_none());
    }
}
