//! Property naming translation
//!
//! Services describe their data with accessor-style names (`getTotal`,
//! `isActive`, `setLimit`) while the wire carries bare field names (`total`,
//! `active`, `limit`). A [`PropertyNamingStrategy`] decides how each kind of
//! name is rendered on the wire, and [`NamingTranslator`] applies it to
//! outbound results and inbound named parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// The role a name plays inside a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Getter,
    Setter,
    Field,
    ConstructorParameter,
}

/// Strategy for rendering internal names on the wire
pub trait PropertyNamingStrategy: Send + Sync + fmt::Debug {
    fn name_for_field(&self, name: &str) -> String {
        name.to_string()
    }

    fn name_for_constructor_parameter(&self, name: &str) -> String {
        name.to_string()
    }

    fn name_for_getter(&self, name: &str) -> String;

    fn name_for_setter(&self, name: &str) -> String;

    /// Wire name for `name` used in the given role
    fn wire_name(&self, name: &str, kind: AccessorKind) -> String {
        match kind {
            AccessorKind::Getter => self.name_for_getter(name),
            AccessorKind::Setter => self.name_for_setter(name),
            AccessorKind::Field => self.name_for_field(name),
            AccessorKind::ConstructorParameter => self.name_for_constructor_parameter(name),
        }
    }

    /// Internal accessor name for a wire name; inverse of [`wire_name`](Self::wire_name)
    fn accessor_for(&self, wire: &str, kind: AccessorKind) -> String {
        match kind {
            AccessorKind::Getter => format!("get{}", capitalize(wire)),
            AccessorKind::Setter => format!("set{}", capitalize(wire)),
            AccessorKind::Field | AccessorKind::ConstructorParameter => wire.to_string(),
        }
    }
}

/// Default policy: getters lose `get`/`is`, setters lose `set`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessorNaming;

impl PropertyNamingStrategy for AccessorNaming {
    fn name_for_getter(&self, name: &str) -> String {
        strip_accessor(name, "get")
            .or_else(|| strip_accessor(name, "is"))
            .unwrap_or_else(|| name.to_string())
    }

    fn name_for_setter(&self, name: &str) -> String {
        strip_accessor(name, "set").unwrap_or_else(|| name.to_string())
    }
}

/// "Equal name" policy: getters and setters are treated alike and any
/// accessor prefix is stripped from either.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualNaming;

impl EqualNaming {
    fn strip_any(name: &str) -> String {
        ["get", "set", "is"]
            .iter()
            .find_map(|prefix| strip_accessor(name, prefix))
            .unwrap_or_else(|| name.to_string())
    }
}

impl PropertyNamingStrategy for EqualNaming {
    fn name_for_getter(&self, name: &str) -> String {
        Self::strip_any(name)
    }

    fn name_for_setter(&self, name: &str) -> String {
        Self::strip_any(name)
    }
}

/// Naming policy selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingPolicy {
    #[default]
    Accessor,
    Equal,
}

impl NamingPolicy {
    pub fn strategy(&self) -> Arc<dyn PropertyNamingStrategy> {
        match self {
            NamingPolicy::Accessor => Arc::new(AccessorNaming),
            NamingPolicy::Equal => Arc::new(EqualNaming),
        }
    }
}

/// `getTotal` with prefix `get` becomes `total`.
/// Returns `None` when the prefix is absent or not followed by an upper-case letter.
fn strip_accessor(name: &str, prefix: &str) -> Option<String> {
    let rest = name.strip_prefix(prefix)?;
    let first = rest.chars().next()?;
    if !first.is_uppercase() {
        return None;
    }
    Some(decapitalize(rest))
}

fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Applies a naming strategy to values crossing the wire
#[derive(Debug, Clone)]
pub struct NamingTranslator {
    strategy: Arc<dyn PropertyNamingStrategy>,
}

impl Default for NamingTranslator {
    fn default() -> Self {
        Self::new(Arc::new(AccessorNaming))
    }
}

impl NamingTranslator {
    pub fn new(strategy: Arc<dyn PropertyNamingStrategy>) -> Self {
        Self { strategy }
    }

    pub fn from_policy(policy: NamingPolicy) -> Self {
        Self::new(policy.strategy())
    }

    pub fn strategy(&self) -> &dyn PropertyNamingStrategy {
        self.strategy.as_ref()
    }

    /// Rename the object keys of an outbound value, recursively.
    ///
    /// When two keys render to the same wire name the later value wins and
    /// keeps the position of the first.
    pub fn encode_value(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut renamed = Map::with_capacity(map.len());
                for (key, inner) in map {
                    let wire = self.strategy.name_for_getter(&key);
                    if renamed.contains_key(&wire) {
                        warn!(
                            "Result key '{}' collides with '{}' on the wire, keeping the later value",
                            key, wire
                        );
                    }
                    renamed.insert(wire, self.encode_value(inner));
                }
                Value::Object(renamed)
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.encode_value(v)).collect())
            }
            other => other,
        }
    }

    /// Whether a wire key addresses the declared parameter `param`
    pub fn matches_param(&self, wire: &str, param: &str) -> bool {
        wire == self.strategy.name_for_constructor_parameter(param)
            || wire == self.strategy.name_for_setter(param)
    }

    /// Order named arguments by the declared parameter names.
    ///
    /// Parameters missing from `args` are passed as `null`. Returns the first
    /// wire key that addresses no declared parameter as the error.
    pub fn decode_params(
        &self,
        args: &Map<String, Value>,
        declared: &[String],
    ) -> Result<Vec<Value>, String> {
        if let Some(unknown) = args
            .keys()
            .find(|key| !declared.iter().any(|param| self.matches_param(key, param)))
        {
            return Err(unknown.clone());
        }

        Ok(declared
            .iter()
            .map(|param| {
                args.iter()
                    .find(|(key, _)| self.matches_param(key, param))
                    .map(|(_, value)| value.clone())
                    .unwrap_or(Value::Null)
            })
            .collect())
    }
}
