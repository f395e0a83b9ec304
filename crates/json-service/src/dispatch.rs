//! Request dispatcher
//!
//! Entry point for raw payloads. A payload is parsed, the target service is
//! looked up by the identifier carried in the [`CallContext`], and the value is
//! classified: an object is one call, an array is a batch whose elements are
//! dispatched in order with independent outcomes. Successful results are
//! written bare; failures become error envelopes. No failure, including a
//! panicking operation, escapes the dispatcher.

use serde_json::{Map, Value, json};
use std::io::{self, Read, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::JSONRPC_VERSION;
use crate::config::DispatcherConfig;
use crate::error::{ErrorEnvelope, ServiceError};
use crate::invoker::ServiceInvoker;
use crate::naming::NamingTranslator;
use crate::registry::ServiceRegistry;
use crate::service::CallContext;
use crate::smd::ServiceMap;
use crate::types::RequestId;

/// Written when even serializing the response fails
const FALLBACK_RESPONSE: &[u8] =
    br#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid Request"},"id":null}"#;

/// What the transport asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Return the service mapping description
    Describe,
    /// Invoke one or more operations
    Invoke,
}

impl RequestKind {
    /// `GET` describes, every other verb invokes
    pub fn from_http_method(method: &str) -> Self {
        if method.eq_ignore_ascii_case("GET") {
            RequestKind::Describe
        } else {
            RequestKind::Invoke
        }
    }
}

/// Result of dispatching one payload
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Response to a single request object, or an error for the whole payload
    Single(Value),
    /// One response per batch element, in request order
    Batch(Vec<Value>),
}

impl DispatchOutcome {
    pub fn into_value(self) -> Value {
        match self {
            DispatchOutcome::Single(value) => value,
            DispatchOutcome::Batch(values) => Value::Array(values),
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, DispatchOutcome::Batch(_))
    }
}

pub struct RequestDispatcher {
    registry: Arc<ServiceRegistry>,
    naming: NamingTranslator,
    config: DispatcherConfig,
}

impl RequestDispatcher {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self::with_config(registry, DispatcherConfig::default())
    }

    pub fn with_config(registry: Arc<ServiceRegistry>, config: DispatcherConfig) -> Self {
        Self {
            registry,
            naming: NamingTranslator::from_policy(config.naming),
            config,
        }
    }

    /// Use a custom naming translator instead of the configured policy
    pub fn with_naming(mut self, naming: NamingTranslator) -> Self {
        self.naming = naming;
        self
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Route a transport request: describe the service or dispatch `body`
    pub fn handle_request(&self, kind: RequestKind, context: &CallContext, body: &[u8]) -> Vec<u8> {
        match kind {
            RequestKind::Describe => self.describe_bytes(&context.service),
            RequestKind::Invoke => self.handle_bytes(context, body),
        }
    }

    /// Read a payload from `reader` and write the response to `writer`.
    ///
    /// Only I/O failures of the reader or writer are returned.
    pub fn handle<R: Read, W: Write>(
        &self,
        context: &CallContext,
        mut reader: R,
        mut writer: W,
    ) -> io::Result<()> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        let output = self.handle_bytes(context, &input);
        writer.write_all(&output)?;
        writer.flush()
    }

    /// Dispatch a raw payload and return the serialized response
    pub fn handle_bytes(&self, context: &CallContext, input: &[u8]) -> Vec<u8> {
        let outcome = match serde_json::from_slice::<Value>(input) {
            Ok(request) => self.dispatch_value(context, request),
            Err(e) => {
                warn!("Unparseable request for service {}: {}", context.service, e);
                DispatchOutcome::Single(self.parse_failure())
            }
        };
        serialize(&outcome.into_value())
    }

    /// Dispatch an already parsed payload
    pub fn dispatch_value(&self, context: &CallContext, request: Value) -> DispatchOutcome {
        let Some(invoker) = self.registry.lookup(&context.service) else {
            let id = match &request {
                Value::Object(map) => request_id(map),
                _ => None,
            };
            return DispatchOutcome::Single(
                self.error_value(ServiceError::ServiceNotFound(context.service.clone()), id),
            );
        };

        match request {
            Value::Array(items) if !items.is_empty() => {
                debug!(
                    "Dispatching batch of {} to service {}",
                    items.len(),
                    context.service
                );
                DispatchOutcome::Batch(
                    items
                        .into_iter()
                        .map(|item| self.dispatch_element(invoker.as_ref(), context, item))
                        .collect(),
                )
            }
            other => DispatchOutcome::Single(self.dispatch_element(invoker.as_ref(), context, other)),
        }
    }

    /// Invoke `method` directly with positional arguments, skipping parsing
    pub fn handle_call(&self, context: &CallContext, method: &str, args: Vec<Value>) -> Value {
        let Some(invoker) = self.registry.lookup(&context.service) else {
            return self.error_value(ServiceError::ServiceNotFound(context.service.clone()), None);
        };
        let result = guard(|| invoker.process(context, method, args));
        self.shape(result, None)
    }

    pub fn service_map(&self, service: &str) -> Result<ServiceMap, ServiceError> {
        let invoker = self
            .registry
            .lookup(service)
            .ok_or_else(|| ServiceError::ServiceNotFound(service.to_string()))?;
        guard(|| Ok(invoker.service_map()))
    }

    /// Serialized service map, or an error envelope when it cannot be produced
    pub fn describe_bytes(&self, service: &str) -> Vec<u8> {
        match self.service_map(service) {
            Ok(map) => match serde_json::to_vec(&map) {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("Failed to serialize service map for {}: {}", service, e);
                    FALLBACK_RESPONSE.to_vec()
                }
            },
            Err(e) => serialize(&self.error_value(e, None)),
        }
    }

    fn dispatch_element(
        &self,
        invoker: &dyn ServiceInvoker,
        context: &CallContext,
        element: Value,
    ) -> Value {
        match element {
            Value::Object(map) => {
                let id = request_id(&map);
                let result = guard(|| invoker.process_request(context, &map, &self.naming));
                self.shape(result, id)
            }
            Value::Array(items) if !items.is_empty() => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.dispatch_element(invoker, context, item))
                    .collect(),
            ),
            other => {
                debug!("Rejecting non-request value: {}", other);
                ErrorEnvelope::invalid_request(None).to_value()
            }
        }
    }

    fn shape(&self, result: Result<Value, ServiceError>, id: Option<RequestId>) -> Value {
        match result {
            Ok(value) => {
                let value = self.naming.encode_value(value);
                if self.config.wrap_results {
                    json!({"jsonrpc": JSONRPC_VERSION, "result": value, "id": id})
                } else {
                    value
                }
            }
            Err(e) => self.error_value(e, id),
        }
    }

    fn error_value(&self, error: ServiceError, id: Option<RequestId>) -> Value {
        match &error {
            ServiceError::Internal { .. } => error!("Operation failed: {}", error),
            _ => warn!("Request rejected: {}", error),
        }
        let error = if self.config.include_diagnostics {
            error
        } else {
            error.without_diagnostic()
        };
        ErrorEnvelope::new(id, error.to_error_object()).to_value()
    }

    fn parse_failure(&self) -> Value {
        let envelope = if self.config.strict_parse_errors {
            ErrorEnvelope::parse_error()
        } else {
            ErrorEnvelope::invalid_request(None)
        };
        envelope.to_value()
    }
}

fn request_id(map: &Map<String, Value>) -> Option<RequestId> {
    map.get("id").and_then(RequestId::from_value)
}

/// Run an invocation, turning a panic into an internal error
fn guard<T>(f: impl FnOnce() -> Result<T, ServiceError>) -> Result<T, ServiceError> {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(ServiceError::from_panic(payload.as_ref())))
}

fn serialize(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_else(|e| {
        error!("Failed to serialize response: {}", e);
        FALLBACK_RESPONSE.to_vec()
    })
}
