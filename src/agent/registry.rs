//! Name-keyed tool registry.
//!
//! The registry also mirrors each tool's most recent sources. That shared
//! view is only meaningful when one query runs at a time; concurrent
//! callers should use the sources returned with each dispatch instead.

use super::tool::{Source, Tool, ToolDefinition, ToolOutput};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Registered tools in registration order, dispatched by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    latest: Mutex<Vec<Vec<Source>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its declared name.
    ///
    /// A tool with an existing name replaces the earlier one in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        let latest = self.latest.get_mut().unwrap_or_else(|e| e.into_inner());

        match self.index.get(&name) {
            Some(&slot) => {
                warn!("Replacing already registered tool '{}'", name);
                self.tools[slot] = tool;
                latest[slot].clear();
            }
            None => {
                debug!("Registered tool '{}'", name);
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
                latest.push(Vec::new());
            }
        }
    }

    /// Builder-style registration.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    /// Definitions of every registered tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Execute a tool by name.
    ///
    /// Never fails: unknown names, tool errors and panics all come back as text.
    pub async fn dispatch(&self, name: &str, args: &serde_json::Value) -> ToolOutput {
        let Some(&slot) = self.index.get(name) else {
            warn!("Model requested unknown tool '{}'", name);
            return ToolOutput::text(format!("Tool '{}' not found", name));
        };

        let tool = Arc::clone(&self.tools[slot]);
        let outcome = AssertUnwindSafe(tool.execute(args)).catch_unwind().await;

        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Tool '{}' failed: {}", name, e);
                ToolOutput::text(format!("Tool execution failed: {}", e))
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                warn!("Tool '{}' panicked: {}", name, reason);
                ToolOutput::text(format!("Tool execution failed: {}", reason))
            }
        };

        if let Ok(mut latest) = self.latest.lock() {
            latest[slot] = output.sources.clone();
        }

        output
    }

    /// Labels of each tool's latest sources, in registration order.
    pub fn collect_sources(&self) -> Vec<String> {
        self.latest_sources().into_iter().map(|s| s.label).collect()
    }

    /// Links parallel to [`collect_sources`](Self::collect_sources).
    pub fn collect_links(&self) -> Vec<Option<String>> {
        self.latest_sources().into_iter().map(|s| s.link).collect()
    }

    /// Every tool's latest sources, flattened in registration order.
    pub fn latest_sources(&self) -> Vec<Source> {
        match self.latest.lock() {
            Ok(latest) => latest.iter().flatten().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Forget the latest sources of every tool.
    pub fn reset_sources(&self) {
        if let Ok(mut latest) = self.latest.lock() {
            latest.iter_mut().for_each(Vec::clear);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
