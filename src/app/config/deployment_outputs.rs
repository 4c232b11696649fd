//! Deployment outputs (CDK `--outputs-file` documents).
//!
//! The document maps stack names to output records:
//!
//! ```json
//! { "cloudxserverless": { "AppInstancePublicIp8A3C5E1B": "3.120.4.5" } }
//! ```
//!
//! Output keys carry a generated suffix, so lookups go by prefix.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// All stacks of one outputs document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentOutputs {
    stacks: BTreeMap<String, StackOutputs>,
}

/// Outputs of a single stack
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackOutputs {
    name: String,
    outputs: BTreeMap<String, Value>,
}

impl DeploymentOutputs {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, Value>> =
            serde_json::from_str(content).context("Deployment outputs must be a JSON object of stacks")?;

        let stacks = raw
            .into_iter()
            .map(|(name, outputs)| {
                let stack = StackOutputs {
                    name: name.clone(),
                    outputs,
                };
                (name, stack)
            })
            .collect();

        Ok(Self { stacks })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment outputs {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid deployment outputs {}", path.display()))
    }

    /// Merge several documents (e.g. the image and serverless stacks)
    pub fn merged(documents: impl IntoIterator<Item = DeploymentOutputs>) -> Self {
        let mut stacks = BTreeMap::new();
        for document in documents {
            stacks.extend(document.stacks);
        }
        Self { stacks }
    }

    pub fn stack(&self, name: &str) -> Option<&StackOutputs> {
        self.stacks.get(name)
    }

    pub fn require_stack(&self, name: &str) -> Result<&StackOutputs> {
        self.stack(name).ok_or_else(|| {
            anyhow!(
                "Stack '{}' not found in deployment outputs (available: {})",
                name,
                self.stack_names().collect::<Vec<_>>().join(", ")
            )
        })
    }

    pub fn stack_names(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys().map(String::as_str)
    }
}

impl StackOutputs {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the first output (in key order) whose name starts with `prefix`
    ///
    /// Non-string values are rendered as JSON.
    pub fn get(&self, prefix: &str) -> Option<String> {
        self.outputs
            .iter()
            .find(|(key, _)| key.starts_with(prefix))
            .map(|(_, value)| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    }

    pub fn require(&self, prefix: &str) -> Result<String> {
        self.get(prefix).ok_or_else(|| {
            anyhow!(
                "No output starting with '{}' in stack '{}'",
                prefix,
                self.name
            )
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
