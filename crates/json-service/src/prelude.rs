//! # JSON Service Prelude
//!
//! ```rust
//! use json_service::prelude::*;
//! ```

// Building services
pub use crate::invoker::{MethodInvoker, ServiceBuilder, ServiceInvoker};
pub use crate::service::{CallContext, OperationSpec, ParamType};

// Hosting them
pub use crate::config::DispatcherConfig;
pub use crate::dispatch::{RequestDispatcher, RequestKind};
pub use crate::naming::{NamingPolicy, NamingTranslator};
pub use crate::registry::ServiceRegistry;

// Errors and values
pub use crate::data_uri::DataUri;
pub use crate::error::{ErrorCode, RegistrationError, ServiceError};
pub use crate::types::RequestId;

pub use crate::error_codes::*;
