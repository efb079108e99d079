//! Stored integration commands: list, show, add, remove, clear.

use std::io::{IsTerminal, Read};

use deepnote_core::integrations::storage::ensure_user_editable;
use deepnote_core::integrations::{IntegrationConfig, IntegrationType};
use dialoguer::Confirm;

use crate::app::AppContext;
use crate::errors::CliError;
use crate::output::{integrations_json, integrations_table, redacted_json};

pub async fn list(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let registry = ctx.open_registry().await?;
    let configs = registry.get_all().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&integrations_json(&configs))?);
    } else if configs.is_empty() {
        println!("No integrations stored.");
    } else {
        println!("{}", integrations_table(&configs));
    }
    Ok(())
}

pub async fn show(ctx: &AppContext, id: &str) -> anyhow::Result<()> {
    let registry = ctx.open_registry().await?;
    let config = registry.get_integration_config(id).await.ok_or_else(|| {
        CliError::not_found(
            format!("Integration not found: {}", id),
            "Run `deepnote list` to see stored integrations",
        )
    })?;

    println!("{}", serde_json::to_string_pretty(&redacted_json(&config)?)?);
    Ok(())
}

fn read_source(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| anyhow::anyhow!("Failed to read stdin: {}", e))?;
        return Ok(buffer);
    }

    std::fs::read_to_string(file).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CliError::not_found(
                format!("Config file not found: {}", file),
                "Pass a JSON file or `-` to read stdin",
            )
            .into()
        } else {
            anyhow::anyhow!("Failed to read {}: {}", file, e)
        }
    })
}

/// Parse a config record; the `version` field is optional on input.
pub fn parse_config(source: &str) -> anyhow::Result<IntegrationConfig> {
    serde_json::from_str(source)
        .map_err(|e| CliError::invalid_input(format!("Invalid integration config: {}", e)).into())
}

pub async fn add(ctx: &AppContext, file: &str) -> anyhow::Result<()> {
    let config = parse_config(&read_source(file)?)?;
    ensure_user_editable(&config.id)?;
    if config.integration_type() == IntegrationType::DuckDb {
        return Err(CliError::invalid_input(format!(
            "Integration {} uses the built-in dataframe engine and cannot be stored",
            config.id
        ))
        .into());
    }

    let registry = ctx.open_registry().await?;
    let existed = registry.get_integration_config(&config.id).await.is_some();
    let id = config.id.clone();
    registry.save(config).await?;

    if existed {
        println!("Updated integration {}", id);
    } else {
        println!("Added integration {}", id);
    }
    Ok(())
}

pub async fn remove(ctx: &AppContext, id: &str) -> anyhow::Result<()> {
    ensure_user_editable(id)?;

    let registry = ctx.open_registry().await?;
    if registry.get_integration_config(id).await.is_none() {
        return Err(CliError::not_found(
            format!("Integration not found: {}", id),
            "Run `deepnote list` to see stored integrations",
        )
        .into());
    }
    registry.delete(id).await?;

    println!("Removed integration {}", id);
    Ok(())
}

pub async fn clear(ctx: &AppContext, yes: bool) -> anyhow::Result<()> {
    if !yes {
        if !std::io::stdin().is_terminal() {
            return Err(CliError::invalid_input("Refusing to clear without --yes").into());
        }
        let confirmed = Confirm::new()
            .with_prompt("Remove every stored integration?")
            .default(false)
            .interact()
            .map_err(|e| anyhow::anyhow!("Failed to read confirmation: {}", e))?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let registry = ctx.open_registry().await?;
    let count = registry.get_all().await.len();
    registry.clear().await?;

    println!("Removed {} integration(s)", count);
    Ok(())
}
