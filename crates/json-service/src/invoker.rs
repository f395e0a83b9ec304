//! Method invoker
//!
//! A [`MethodInvoker`] binds one service type to the operations it exposes.
//! The dispatch table is built once by [`ServiceBuilder`]: every operation is
//! stored under its name with its signature and a typed closure, so a call is
//! resolved by name, arity and argument shape without any runtime
//! introspection. The backing instance is created on first use and shared by
//! every caller afterwards.

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{BoxError, RegistrationError, ServiceError};
use crate::naming::NamingTranslator;
use crate::request::{RequestEnvelope, RequestParams};
use crate::service::{CallContext, FromParams, OperationSpec};
use crate::smd::ServiceMap;

/// Object-safe view of a registered service
pub trait ServiceInvoker: Send + Sync {
    /// Identifier the service is registered under
    fn identifier(&self) -> &str;

    /// Invoke `method` with positional arguments
    fn process(
        &self,
        context: &CallContext,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ServiceError>;

    /// Invoke the operation named by a request object
    fn process_request(
        &self,
        context: &CallContext,
        request: &Map<String, Value>,
        naming: &NamingTranslator,
    ) -> Result<Value, ServiceError>;

    /// Describe the exposed operations
    fn service_map(&self) -> ServiceMap;

    /// Names of the exposed operations, sorted
    fn method_names(&self) -> Vec<String>;

    /// Whether the backing instance has been built
    fn is_initialized(&self) -> bool;
}

/// Why a call did not produce a value
enum CallFailure {
    /// The arguments did not decode into the handler's parameter types
    Decode(String),
    /// The handler ran and failed
    Failed(ServiceError),
}

type OperationFn<S> =
    Arc<dyn Fn(&S, &CallContext, Vec<Value>) -> Result<Value, CallFailure> + Send + Sync>;

struct Operation<S> {
    spec: OperationSpec,
    call: OperationFn<S>,
}

type Factory<S> = Box<dyn Fn() -> S + Send + Sync>;

/// Dispatch table and lazily built instance for one service type
pub struct MethodInvoker<S> {
    identifier: String,
    operations: BTreeMap<String, Vec<Operation<S>>>,
    instance: OnceCell<S>,
    factory: Option<Factory<S>>,
}

impl<S> fmt::Debug for MethodInvoker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvoker")
            .field("identifier", &self.identifier)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("initialized", &self.instance.get().is_some())
            .finish()
    }
}

impl<S: Send + Sync + 'static> MethodInvoker<S> {
    /// Start a definition whose instance is built by `factory` on first use
    pub fn builder<F>(identifier: impl Into<String>, factory: F) -> ServiceBuilder<S>
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        ServiceBuilder::new(identifier.into(), OnceCell::new(), Some(Box::new(factory)))
    }

    /// Start a definition around an already constructed instance
    pub fn with_instance(identifier: impl Into<String>, instance: S) -> ServiceBuilder<S> {
        ServiceBuilder::new(identifier.into(), OnceCell::with_value(instance), None)
    }

    fn instance(&self) -> Result<&S, ServiceError> {
        self.instance.get_or_try_init(|| match &self.factory {
            Some(factory) => {
                debug!("Constructing service instance for '{}'", self.identifier);
                Ok(factory())
            }
            None => Err(ServiceError::Internal {
                message: format!("service '{}' has no instance", self.identifier),
                diagnostic: None,
                source: None,
            }),
        })
    }

    fn overloads(&self, method: &str) -> Result<&[Operation<S>], ServiceError> {
        self.operations
            .get(method)
            .map(Vec::as_slice)
            .ok_or_else(|| ServiceError::MethodNotFound(method.to_string()))
    }

    /// Overloads able to take positional `args`, best first.
    ///
    /// Ordered by score, highest first; equal scores keep declaration order.
    fn candidates(&self, method: &str, args: &[Value]) -> Result<Vec<&Operation<S>>, ServiceError> {
        let overloads = self.overloads(method)?;

        if !overloads.iter().any(|op| op.spec.arity() == args.len()) {
            let mut arities: Vec<usize> = overloads.iter().map(|op| op.spec.arity()).collect();
            arities.sort_unstable();
            arities.dedup();
            return Err(ServiceError::invalid_params(
                method,
                format!(
                    "expected {} argument(s), got {}",
                    arities
                        .iter()
                        .map(usize::to_string)
                        .collect::<Vec<_>>()
                        .join(" or "),
                    args.len()
                ),
            ));
        }

        let mut scored: Vec<(u32, &Operation<S>)> = overloads
            .iter()
            .filter_map(|op| op.spec.score(args).map(|score| (score, op)))
            .collect();
        if scored.is_empty() {
            return Err(ServiceError::invalid_params(
                method,
                "argument types do not match any overload",
            ));
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().map(|(_, op)| op).collect())
    }

    /// Overloads able to take named `args`, best first, each with the
    /// arguments laid out in its declared order
    fn named_candidates(
        &self,
        method: &str,
        args: &Map<String, Value>,
        naming: &NamingTranslator,
    ) -> Result<Vec<(&Operation<S>, Vec<Value>)>, ServiceError> {
        let overloads = self.overloads(method)?;

        let mut scored = Vec::new();
        let mut last_unknown = None;
        for op in overloads {
            let positional = match naming.decode_params(args, &op.spec.param_names()) {
                Ok(positional) => positional,
                Err(unknown) => {
                    last_unknown = Some(unknown);
                    continue;
                }
            };
            if let Some(score) = op.spec.score(&positional) {
                scored.push((score, op, positional));
            }
        }

        if scored.is_empty() {
            return Err(ServiceError::invalid_params(
                method,
                match last_unknown {
                    Some(key) if overloads.len() == 1 => format!("unknown parameter '{}'", key),
                    _ => "named arguments do not match any overload".to_string(),
                },
            ));
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().map(|(_, op, positional)| (op, positional)).collect())
    }

    /// Run the first candidate whose parameter types accept the arguments.
    ///
    /// A handler failure is final; only a decode failure moves on to the
    /// next candidate.
    fn invoke_first<'a>(
        &'a self,
        method: &str,
        context: &CallContext,
        candidates: impl IntoIterator<Item = (&'a Operation<S>, Vec<Value>)>,
    ) -> Result<Value, ServiceError> {
        let instance = self.instance()?;
        let mut last_decode_error = None;
        for (operation, args) in candidates {
            debug!(
                "Invoking {}.{}({})",
                self.identifier,
                operation.spec.name,
                operation.spec.signature()
            );
            match (operation.call)(instance, context, args) {
                Ok(value) => return Ok(value),
                Err(CallFailure::Failed(e)) => return Err(e),
                Err(CallFailure::Decode(reason)) => {
                    debug!(
                        "Arguments do not decode for {}({}): {}",
                        method,
                        operation.spec.signature(),
                        reason
                    );
                    last_decode_error = Some(reason);
                }
            }
        }
        Err(ServiceError::invalid_params(
            method,
            last_decode_error.unwrap_or_else(|| "argument types do not match any overload".to_string()),
        ))
    }
}

impl<S: Send + Sync + 'static> ServiceInvoker for MethodInvoker<S> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn process(
        &self,
        context: &CallContext,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ServiceError> {
        let candidates = self.candidates(method, &args)?;
        self.invoke_first(
            method,
            context,
            candidates.into_iter().map(|op| (op, args.clone())),
        )
    }

    fn process_request(
        &self,
        context: &CallContext,
        request: &Map<String, Value>,
        naming: &NamingTranslator,
    ) -> Result<Value, ServiceError> {
        let request = RequestEnvelope::from_object(request)?;
        match request.params {
            None => self.process(context, &request.method, Vec::new()),
            Some(RequestParams::Array(args)) => self.process(context, &request.method, args),
            Some(RequestParams::Object(args)) => {
                let candidates = self.named_candidates(&request.method, &args, naming)?;
                self.invoke_first(&request.method, context, candidates)
            }
        }
    }

    fn service_map(&self) -> ServiceMap {
        // describing a service counts as first use
        if let Err(e) = self.instance() {
            warn!("Service '{}' could not be constructed: {}", self.identifier, e);
        }
        let mut map = ServiceMap::new(self.identifier.clone());
        for op in self.operations.values().flatten() {
            map.add_operation(&op.spec);
        }
        map
    }

    fn method_names(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }

    fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }
}

/// Builder collecting the operations of one service
pub struct ServiceBuilder<S> {
    identifier: String,
    operations: Vec<Operation<S>>,
    instance: OnceCell<S>,
    factory: Option<Factory<S>>,
    error: Option<RegistrationError>,
}

impl<S: Send + Sync + 'static> ServiceBuilder<S> {
    fn new(identifier: String, instance: OnceCell<S>, factory: Option<Factory<S>>) -> Self {
        let error = identifier
            .trim()
            .is_empty()
            .then_some(RegistrationError::EmptyIdentifier);
        Self {
            identifier,
            operations: Vec::new(),
            instance,
            factory,
            error,
        }
    }

    /// Expose an operation taking the decoded argument tuple `A`
    pub fn operation<A, R, E, F>(self, spec: OperationSpec, handler: F) -> Self
    where
        A: FromParams + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
        F: Fn(&S, A) -> Result<R, E> + Send + Sync + 'static,
    {
        self.operation_with_context(spec, move |service: &S, _ctx: &CallContext, args: A| {
            handler(service, args)
        })
    }

    /// Expose an operation that also receives the call context
    pub fn operation_with_context<A, R, E, F>(mut self, spec: OperationSpec, handler: F) -> Self
    where
        A: FromParams + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
        F: Fn(&S, &CallContext, A) -> Result<R, E> + Send + Sync + 'static,
    {
        if spec.arity() != A::ARITY {
            self.record(RegistrationError::ArityMismatch {
                name: spec.name.clone(),
                declared: spec.arity(),
                handler: A::ARITY,
            });
            return self;
        }

        let call: OperationFn<S> = Arc::new(move |service: &S, ctx: &CallContext, args: Vec<Value>| {
            let args = A::from_params(args).map_err(|e| CallFailure::Decode(e.to_string()))?;
            let result = handler(service, ctx, args).map_err(|e| {
                let source: BoxError = e.into();
                CallFailure::Failed(match source.downcast::<ServiceError>() {
                    Ok(service_error) => *service_error,
                    Err(other) => ServiceError::internal(other),
                })
            })?;
            serde_json::to_value(result)
                .map_err(|e| CallFailure::Failed(ServiceError::internal(Box::new(e))))
        });

        self.operations.push(Operation { spec, call });
        self
    }

    fn record(&mut self, error: RegistrationError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Validate the table and produce the invoker
    pub fn build(self) -> Result<MethodInvoker<S>, RegistrationError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut operations: BTreeMap<String, Vec<Operation<S>>> = BTreeMap::new();
        for op in self.operations {
            let overloads = operations.entry(op.spec.name.clone()).or_default();
            if overloads.iter().any(|existing| {
                existing
                    .spec
                    .params
                    .iter()
                    .map(|p| p.ty)
                    .eq(op.spec.params.iter().map(|p| p.ty))
            }) {
                return Err(RegistrationError::AmbiguousOverload {
                    name: op.spec.name.clone(),
                    signature: op.spec.signature(),
                });
            }
            overloads.push(op);
        }

        Ok(MethodInvoker {
            identifier: self.identifier,
            operations,
            instance: self.instance,
            factory: self.factory,
        })
    }
}
