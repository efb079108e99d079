//! Kernel startup code exporting SQL integration variables.
//!
//! The kernel runs in its own process and does not inherit our environment,
//! so the variables are set from inside the kernel by code executed at
//! startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::sql::env_vars::EnvironmentVariablesProvider;

/// Notebook type owned by this extension.
pub const DEEPNOTE_NOTEBOOK_TYPE: &str = "deepnote";

/// The notebook/kernel pairing startup code is requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelContext {
    pub notebook_type: String,
    /// Kernel language as reported by the kernel spec, e.g. `python`.
    pub language: String,
}

impl KernelContext {
    pub fn new(notebook_type: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            notebook_type: notebook_type.into(),
            language: language.into(),
        }
    }

    pub fn is_python(&self) -> bool {
        self.language.eq_ignore_ascii_case("python")
            || self.language.to_ascii_lowercase().starts_with("python3")
    }

    pub fn is_deepnote_notebook(&self) -> bool {
        self.notebook_type == DEEPNOTE_NOTEBOOK_TYPE
    }
}

/// Python statements setting `variables` in `os.environ`.
///
/// Keys and values are emitted as JSON string literals, which Python parses
/// as equivalent string literals. A failing assignment is reported and the
/// remaining ones still run; nothing here can abort kernel startup.
pub fn build_startup_code(variables: &BTreeMap<String, String>) -> Vec<String> {
    if variables.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![
        "try:".to_string(),
        "    import os".to_string(),
    ];
    for (name, value) in variables {
        let key = quote(name);
        lines.push("    try:".to_string());
        lines.push(format!("        os.environ[{}] = {}", key, quote(value)));
        lines.push("    except Exception as e:".to_string());
        lines.push(format!(
            "        print(\"Failed to set environment variable\", {}, \":\", e)",
            key
        ));
    }
    lines.extend([
        "except Exception as e:".to_string(),
        "    import traceback".to_string(),
        "    print(\"Failed to set SQL integration environment variables:\", e)".to_string(),
        "    traceback.print_exc()".to_string(),
    ]);
    lines
}

fn quote(text: &str) -> String {
    // Serializing a str cannot fail.
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

/// Produces the startup code for Deepnote Python kernels.
pub struct SqlIntegrationStartupCodeProvider {
    environment: Arc<EnvironmentVariablesProvider>,
}

impl SqlIntegrationStartupCodeProvider {
    pub fn new(environment: Arc<EnvironmentVariablesProvider>) -> Self {
        Self { environment }
    }

    /// Startup statements for `kernel`, empty unless it is a Python kernel
    /// attached to a Deepnote notebook.
    pub async fn startup_code(
        &self,
        kernel: &KernelContext,
        project_id: &str,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        if !kernel.is_deepnote_notebook() {
            tracing::debug!(notebook_type = %kernel.notebook_type, "not a deepnote notebook");
            return Vec::new();
        }
        if !kernel.is_python() {
            tracing::debug!(language = %kernel.language, "kernel is not python");
            return Vec::new();
        }

        let variables = self
            .environment
            .get_environment_variables(project_id, cancel)
            .await;
        tracing::debug!(count = variables.len(), project_id, "generated SQL startup code");
        build_startup_code(&variables)
    }
}
