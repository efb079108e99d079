//! Project commands: detect, env, startup-code.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use deepnote_core::integrations::IntegrationDetector;
use deepnote_core::kernel::{KernelContext, SqlIntegrationStartupCodeProvider};
use deepnote_core::project::InMemoryProjects;
use deepnote_core::sql::EnvironmentVariablesProvider;
use tokio_util::sync::CancellationToken;

use crate::app::{load_project, AppContext};
use crate::output::{detection_json, detection_table};

pub async fn detect(ctx: &AppContext, project_file: &Path, json: bool) -> anyhow::Result<()> {
    let project = load_project(project_file)?;
    let project_id = project.id.clone();
    let registry = ctx.open_registry().await?;
    let projects = Arc::new(std::iter::once(project).collect::<InMemoryProjects>());

    let detected = IntegrationDetector::new(registry, projects)
        .detect_integrations(&project_id)
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&detection_json(&detected))?);
    } else if detected.is_empty() {
        println!("Project uses no integrations.");
    } else {
        println!("{}", detection_table(&detected));
    }
    Ok(())
}

async fn environment(
    ctx: &AppContext,
    project_file: &Path,
) -> anyhow::Result<(String, EnvironmentVariablesProvider)> {
    let project = load_project(project_file)?;
    let project_id = project.id.clone();
    let registry = ctx.open_registry().await?;
    let projects = Arc::new(std::iter::once(project).collect::<InMemoryProjects>());
    Ok((project_id, EnvironmentVariablesProvider::new(registry, projects)))
}

pub async fn env(ctx: &AppContext, project_file: &Path, json: bool) -> anyhow::Result<()> {
    let (project_id, provider) = environment(ctx, project_file).await?;
    let variables: BTreeMap<String, String> = provider
        .get_environment_variables(&project_id, &CancellationToken::new())
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&variables)?);
    } else {
        for (name, value) in &variables {
            println!("{}={}", name, value);
        }
    }
    Ok(())
}

pub async fn startup_code(
    ctx: &AppContext,
    project_file: &Path,
    language: &str,
) -> anyhow::Result<()> {
    let (project_id, provider) = environment(ctx, project_file).await?;
    let kernel = KernelContext::new(ctx.config.kernel.notebook_type.clone(), language);

    let code = SqlIntegrationStartupCodeProvider::new(Arc::new(provider))
        .startup_code(&kernel, &project_id, &CancellationToken::new())
        .await;

    if code.is_empty() {
        tracing::warn!(language, "no startup code for this kernel");
    }
    for line in code {
        println!("{}", line);
    }
    Ok(())
}
