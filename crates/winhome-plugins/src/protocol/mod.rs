//! Wire types for the plugin stdio protocol.
//!
//! The reconciler writes one [`PluginRequest`] as a single JSON line to the
//! plugin's stdin and closes it. The plugin writes one [`PluginResult`] JSON
//! object on stdout; diagnostic lines printed before it are tolerated.
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Execution context sent with every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginContext {
    /// When set, the plugin must not mutate the host.
    pub dry_run: bool,
}

impl PluginContext {
    /// Context for a run with the given dry-run flag.
    #[must_use]
    pub const fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

/// Request written to a plugin's stdin.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use winhome_plugins::{PluginContext, PluginRequest};
///
/// let request = PluginRequest::new("install", json!({"packageId": "vim"}), PluginContext::new(true));
/// let line = serde_json::to_string(&request).unwrap();
/// assert!(line.contains("\"command\":\"install\""));
/// assert!(line.contains("\"dryRun\":true"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRequest {
    request_id: String,
    command: String,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    context: PluginContext,
}

impl PluginRequest {
    /// Creates a request with a fresh correlation id.
    #[must_use]
    pub fn new(command: impl Into<String>, args: Value, context: PluginContext) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            command: command.into(),
            args,
            context,
        }
    }

    /// Correlation id echoed back by the plugin.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Command name.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Command arguments.
    #[must_use]
    pub const fn args(&self) -> &Value {
        &self.args
    }

    /// Execution context.
    #[must_use]
    pub const fn context(&self) -> PluginContext {
        self.context
    }
}

/// Result read from a plugin's stdout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginResult {
    /// Correlation id of the request this answers.
    #[serde(default)]
    pub request_id: String,
    /// Whether the command succeeded.
    #[serde(default)]
    pub success: bool,
    /// Whether the command changed the host.
    #[serde(default)]
    pub changed: bool,
    /// Failure description when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Command-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl PluginResult {
    /// Builds a failed result for `request_id`.
    #[must_use]
    pub fn failure(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            changed: false,
            error: Some(error.into()),
            data: Value::Null,
        }
    }

    /// Failure text, or a generic message when the plugin gave none.
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("plugin reported failure without an error message")
    }

    /// Interprets `data` as a boolean answer.
    ///
    /// Accepts a JSON `true`, the string `"true"` in any case, or an object
    /// whose `installed` member is `true`.
    #[must_use]
    pub fn data_is_true(&self) -> bool {
        match &self.data {
            Value::Bool(flag) => *flag,
            Value::String(text) => text.eq_ignore_ascii_case("true"),
            Value::Object(map) => matches!(map.get("installed"), Some(Value::Bool(true))),
            _ => false,
        }
    }
}
