//! Operation signatures and call context
//!
//! These types describe what a service exposes: each operation has a name,
//! an ordered list of typed parameters and an optional return type. The
//! signatures drive overload resolution and the service mapping description.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// JSON shape accepted by a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Any,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl ParamType {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::Any => true,
            ParamType::Boolean => value.is_boolean(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::String => value.is_string(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }

    /// How precisely this type describes a value it accepts
    pub fn specificity(&self) -> u32 {
        match self {
            ParamType::Any => 0,
            ParamType::Number => 1,
            _ => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Any => "any",
            ParamType::Boolean => "boolean",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            optional: true,
            ..Self::new(name, ty)
        }
    }

    /// Match score for `value`, `None` when the value is not accepted
    pub fn score(&self, value: &Value) -> Option<u32> {
        if value.is_null() && self.optional {
            return Some(0);
        }
        self.ty.accepts(value).then(|| self.ty.specificity())
    }
}

/// Signature of one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub returns: Option<ParamType>,
    pub description: Option<String>,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            description: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(ParamSpec::new(name, ty));
        self
    }

    pub fn optional_param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(ParamSpec::optional(name, ty));
        self
    }

    pub fn returns(mut self, ty: ParamType) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    /// Rendered parameter type list, e.g. `integer, integer`
    pub fn signature(&self) -> String {
        self.params
            .iter()
            .map(|p| p.ty.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Sum of per-argument scores; `None` if arity or any type mismatches
    pub fn score(&self, args: &[Value]) -> Option<u32> {
        if args.len() != self.params.len() {
            return None;
        }
        self.params
            .iter()
            .zip(args)
            .map(|(param, value)| param.score(value))
            .sum()
    }
}

/// Per-call information handed to operations by the transport
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Identifier of the service being called
    pub service: String,
    /// Transport verb, when there is one (e.g. `POST`)
    pub verb: Option<String>,
    /// Free-form metadata supplied by the host
    pub metadata: HashMap<String, Value>,
}

impl CallContext {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }

    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = Some(verb.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// Argument tuples that can be decoded from positional parameters
pub trait FromParams: Sized {
    const ARITY: usize;

    fn from_params(args: Vec<Value>) -> Result<Self, serde_json::Error>;
}

impl FromParams for () {
    const ARITY: usize = 0;

    fn from_params(args: Vec<Value>) -> Result<Self, serde_json::Error> {
        if args.is_empty() {
            Ok(())
        } else {
            Err(serde::de::Error::invalid_length(args.len(), &"no arguments"))
        }
    }
}

macro_rules! impl_from_params {
    ($arity:expr; $($ty:ident),+) => {
        impl<$($ty: DeserializeOwned),+> FromParams for ($($ty,)+) {
            const ARITY: usize = $arity;

            fn from_params(args: Vec<Value>) -> Result<Self, serde_json::Error> {
                serde_json::from_value(Value::Array(args))
            }
        }
    };
}

impl_from_params!(1; A);
impl_from_params!(2; A, B);
impl_from_params!(3; A, B, C);
impl_from_params!(4; A, B, C, D);
impl_from_params!(5; A, B, C, D, E);
impl_from_params!(6; A, B, C, D, E, F);
impl_from_params!(7; A, B, C, D, E, F, G);
impl_from_params!(8; A, B, C, D, E, F, G, H);
