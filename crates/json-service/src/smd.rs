//! Service Mapping Description
//!
//! A read-only listing of what a registered service exposes, in the SMD 2.0
//! layout. Overloads of one name are listed together under that name in
//! declaration order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::service::{OperationSpec, ParamSpec, ParamType};

pub const SMD_VERSION: &str = "2.0";
pub const SMD_ENVELOPE: &str = "JSON-RPC-2.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMap {
    pub transport: String,
    pub envelope: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    #[serde(rename = "SMDVersion")]
    pub smd_version: String,
    pub target: String,
    pub services: BTreeMap<String, Vec<MethodDescriptor>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub parameters: Vec<ParamSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<ParamType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&OperationSpec> for MethodDescriptor {
    fn from(spec: &OperationSpec) -> Self {
        Self {
            parameters: spec.params.clone(),
            returns: spec.returns,
            description: spec.description.clone(),
        }
    }
}

impl ServiceMap {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            transport: "POST".to_string(),
            envelope: SMD_ENVELOPE.to_string(),
            content_type: "application/json".to_string(),
            smd_version: SMD_VERSION.to_string(),
            target: target.into(),
            services: BTreeMap::new(),
        }
    }

    pub fn add_operation(&mut self, spec: &OperationSpec) {
        self.services
            .entry(spec.name.clone())
            .or_default()
            .push(MethodDescriptor::from(spec));
    }

    pub fn method_count(&self) -> usize {
        self.services.values().map(Vec::len).sum()
    }
}
