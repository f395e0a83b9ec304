//! # JSON Service
//!
//! A transport-agnostic JSON-RPC 2.0 request dispatcher for plain Rust
//! service objects. Services describe their operations once, at
//! registration, and the dispatcher routes incoming requests to them by
//! method name and argument shape.
//!
//! ## Features
//! - Overload resolution by arity and parameter type
//! - Positional and named parameters, with pluggable property naming
//! - Lazily constructed service instances
//! - Thread-safe registry with a process-wide default instance
//! - Service map (SMD) descriptions for GET-style discovery
//! - RFC 2397 `data:` URI values usable as arguments and results
//!
//! ```rust
//! use json_service::prelude::*;
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! struct Calculator;
//!
//! let invoker = MethodInvoker::with_instance("calc", Calculator)
//!     .operation(
//!         OperationSpec::new("add")
//!             .param("a", ParamType::Integer)
//!             .param("b", ParamType::Integer),
//!         |_: &Calculator, (a, b): (i64, i64)| Ok::<_, Infallible>(a + b),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let registry = Arc::new(ServiceRegistry::new());
//! registry.register(invoker);
//!
//! let dispatcher = RequestDispatcher::new(registry);
//! let reply = dispatcher.handle_bytes(
//!     &CallContext::new("calc"),
//!     br#"{"method":"add","params":[2,3],"id":1}"#,
//! );
//! assert_eq!(reply, b"5");
//! ```

pub mod config;
pub mod data_uri;
pub mod dispatch;
pub mod error;
pub mod invoker;
pub mod naming;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod service;
pub mod smd;
pub mod types;

// Re-export main types
pub use config::DispatcherConfig;
pub use data_uri::{DataUri, DataUriError};
pub use dispatch::{DispatchOutcome, RequestDispatcher, RequestKind};
pub use error::{ErrorCode, ErrorEnvelope, ErrorObject, RegistrationError, ServiceError};
pub use invoker::{MethodInvoker, ServiceBuilder, ServiceInvoker};
pub use naming::{AccessorNaming, EqualNaming, NamingPolicy, NamingTranslator, PropertyNamingStrategy};
pub use registry::ServiceRegistry;
pub use request::{RequestEnvelope, RequestParams};
pub use service::{CallContext, FromParams, OperationSpec, ParamSpec, ParamType};
pub use smd::{MethodDescriptor, ServiceMap};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
