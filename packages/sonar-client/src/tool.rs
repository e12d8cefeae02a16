//! Tool capability interface.
//!
//! A tool is a typed function with a name, a JSON-schema described argument
//! type, and an async `call`. Tools are registered by value in a
//! [`ToolRegistry`], which dispatches JSON-encoded invocations by name. The
//! registry is what an external agent loop would hold; this crate does not run
//! one.
//!
//! # Example
//!
//! ```rust,ignore
//! #[derive(Deserialize, JsonSchema)]
//! struct LookupArgs {
//!     city: String,
//! }
//!
//! struct Weather;
//!
//! #[async_trait]
//! impl Tool for Weather {
//!     const NAME: &'static str = "get_weather";
//!     type Args = LookupArgs;
//!     type Output = String;
//!     type Error = std::convert::Infallible;
//!
//!     fn description(&self) -> &str {
//!         "Current weather for a city"
//!     }
//!
//!     async fn call(&self, args: LookupArgs) -> Result<String, Self::Error> {
//!         Ok(format!("The weather in {} is sunny.", args.city))
//!     }
//! }
//!
//! let registry = ToolRegistry::new().with(Weather);
//! let out = registry.call("get_weather", r#"{"city":"Tokyo"}"#).await?;
//! ```

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::schema::StructuredOutput;

/// A tool callable with typed arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    const NAME: &'static str;

    /// Argument type; its schema is advertised to the caller.
    type Args: DeserializeOwned + JsonSchema + Send;

    /// Output type, returned to the caller as JSON.
    type Output: Serialize + Send;

    /// Error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// What this tool does.
    fn description(&self) -> &str;

    /// Execute the tool.
    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;

    /// Definition advertised to callers.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: self.description().to_string(),
            parameters: Self::Args::sonar_schema(),
        }
    }
}

/// Name, description and parameter schema of a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Chat-completions `tools` entry for this definition.
    pub fn to_function_format(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }
}

/// Type-erased tool for heterogeneous collections.
#[async_trait]
pub trait ErasedTool: Send + Sync {
    fn name(&self) -> &str;

    fn definition(&self) -> ToolDefinition;

    /// Execute with JSON arguments, returning JSON output.
    async fn call_erased(&self, arguments: &str) -> Result<String, ToolError>;
}

/// Errors from dispatching a tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Failed to parse arguments: {0}")]
    ArgumentParse(String),

    #[error("Tool execution failed: {0}")]
    Execution(String),

    #[error("Failed to serialize output: {0}")]
    OutputSerialize(String),
}

#[async_trait]
impl<T: Tool> ErasedTool for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    async fn call_erased(&self, arguments: &str) -> Result<String, ToolError> {
        let args: T::Args = serde_json::from_str(arguments)
            .map_err(|e| ToolError::ArgumentParse(e.to_string()))?;

        let output = self
            .call(args)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        serde_json::to_string(&output).map_err(|e| ToolError::OutputSerialize(e.to_string()))
    }
}

/// Tools registered by value, dispatched by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn ErasedTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later tool with the same name replaces the earlier one.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.retain(|t| t.name() != T::NAME);
        self.tools.push(Box::new(tool));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of every registered tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Invoke the named tool with JSON arguments.
    pub async fn call(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tracing::debug!(tool = name, "Dispatching tool call");
        tool.call_erased(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct CityArgs {
        city: String,
    }

    struct Weather;

    #[async_trait]
    impl Tool for Weather {
        const NAME: &'static str = "get_weather";
        type Args = CityArgs;
        type Output = String;
        type Error = std::convert::Infallible;

        fn description(&self) -> &str {
            "Current weather for a city"
        }

        async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
            Ok(format!("The weather in {} is sunny.", args.city))
        }
    }

    #[test]
    fn test_tool_definition() {
        let def = Tool::definition(&Weather);

        assert_eq!(def.name, "get_weather");
        assert_eq!(def.description, "Current weather for a city");
        assert_eq!(def.parameters["properties"]["city"]["type"], "string");
    }

    #[test]
    fn test_function_format() {
        let value = Tool::definition(&Weather).to_function_format();

        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "get_weather");
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_name() {
        let registry = ToolRegistry::new().with(Weather);

        let out = registry
            .call("get_weather", r#"{"city": "Tokyo"}"#)
            .await
            .unwrap();
        let text: String = serde_json::from_str(&out).unwrap();
        assert_eq!(text, "The weather in Tokyo is sunny.");
    }

    #[tokio::test]
    async fn test_registry_unknown_tool() {
        let registry = ToolRegistry::new().with(Weather);

        let err = registry.call("get_time", "{}").await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "get_time"));
    }

    #[tokio::test]
    async fn test_registry_bad_arguments() {
        let registry = ToolRegistry::new().with(Weather);

        let err = registry.call("get_weather", r#"{"town": 1}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::ArgumentParse(_)));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Weather);
        registry.register(Weather);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].name, "get_weather");
    }
}
