use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::llm::{ToolCall, ToolSpec};

/// A callable capability exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to request the tool.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the argument object.
    fn parameters(&self) -> Value;

    /// Run the tool. Soft failures come back as text, not errors.
    async fn invoke(&self, arguments: &Value) -> Result<String, ApiError>;
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    spec: ToolSpec,
    validator: jsonschema::Validator,
}

/// Name to tool mapping, filled once at startup and read-only afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(tools: Vec<Arc<dyn Tool>>) -> Result<Self, ApiError> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ApiError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("Tool name must not be empty".to_string()));
        }
        if self.by_name.contains_key(&name) {
            return Err(ApiError::BadRequest(format!(
                "Tool '{}' is already registered",
                name
            )));
        }

        let parameters = tool.parameters();
        let validator = jsonschema::validator_for(&parameters).map_err(|err| {
            ApiError::BadRequest(format!("Tool '{}' has an invalid schema: {}", name, err))
        })?;

        let spec = ToolSpec {
            name: name.clone(),
            description: tool.description().to_string(),
            parameters,
        };

        self.by_name.insert(name.clone(), self.entries.len());
        self.entries.push(RegisteredTool {
            tool,
            spec,
            validator,
        });
        tracing::debug!("Registered tool {}", name);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.spec.name.clone()).collect()
    }

    /// The catalog advertised to the model, in registration order.
    pub fn catalog(&self) -> Vec<ToolSpec> {
        self.entries.iter().map(|e| e.spec.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.by_name
            .get(name)
            .map(|&index| self.entries[index].tool.clone())
    }

    /// Every advertised tool must be registered with the same schema, once.
    pub fn validate_catalog(&self, advertised: &[ToolSpec]) -> Result<(), ApiError> {
        let mut seen = HashMap::new();
        for spec in advertised {
            if seen.insert(spec.name.as_str(), ()).is_some() {
                return Err(ApiError::BadRequest(format!(
                    "Tool '{}' is advertised twice",
                    spec.name
                )));
            }
            let Some(&index) = self.by_name.get(&spec.name) else {
                return Err(ApiError::BadRequest(format!(
                    "Advertised tool '{}' has no registered implementation",
                    spec.name
                )));
            };
            if self.entries[index].spec.parameters != spec.parameters {
                return Err(ApiError::BadRequest(format!(
                    "Advertised schema of tool '{}' differs from the registered one",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Dispatch a model-requested call.
    pub async fn invoke(&self, call: &ToolCall) -> Result<String, ApiError> {
        self.invoke_direct(&call.name, &call.arguments).await
    }

    /// Invoke a tool by name outside the agent loop.
    pub async fn invoke_direct(&self, name: &str, arguments: &Value) -> Result<String, ApiError> {
        let Some(&index) = self.by_name.get(name) else {
            return Err(ApiError::NotFound(format!("Unknown tool: {}", name)));
        };
        let entry = &self.entries[index];

        if !entry.validator.is_valid(arguments) {
            let details: Vec<String> = entry
                .validator
                .iter_errors(arguments)
                .map(|err| err.to_string())
                .collect();
            return Err(ApiError::BadRequest(format!(
                "Invalid arguments for tool '{}': {}",
                name,
                details.join("; ")
            )));
        }

        tracing::debug!("Invoking tool {} with {}", name, arguments);
        entry.tool.invoke(arguments).await
    }
}
