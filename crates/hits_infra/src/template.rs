use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

/// One CloudFormation resource declaration.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(rename = "Properties")]
    pub properties: Value,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            deletion_policy: None,
            properties,
        }
    }

    pub fn with_deletion_policy(mut self, policy: impl Into<String>) -> Self {
        self.deletion_policy = Some(policy.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Output {
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Value")]
    pub value: Value,
}

/// A full template document.
///
/// Resources and outputs live in `BTreeMap`s so a synthesized template is
/// byte-stable across runs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, Resource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: "2010-09-09".to_string(),
            description: description.into(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn add_resource(&mut self, logical_id: impl Into<String>, resource: Resource) {
        self.resources.insert(logical_id.into(), resource);
    }

    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        value: Value,
    ) {
        self.outputs.insert(
            name.into(),
            Output {
                description: description.into(),
                value,
            },
        );
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).expect("template serialization should not fail")
    }
}

pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

pub fn attribute(logical_id: &str, attribute_name: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute_name] })
}

pub fn substitution(pattern: &str) -> Value {
    json!({ "Fn::Sub": pattern })
}
