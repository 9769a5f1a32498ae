//! Registry command handlers.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use foundee_core::api::ApiError;
use foundee_core::registry::Registry;
use foundee_core::routes::Route;

use super::App;

/// Loads the registry, or says where to go instead.
async fn load(app: &App) -> Result<Result<Registry, Route>> {
    let here = Route::Registry;
    if let Err(route) = app.session().require_for(&here) {
        return Ok(Err(route));
    }
    let mut registry = Registry::new(app.client.clone(), app.origin.clone());
    match registry.load().await {
        Ok(()) => Ok(Ok(registry)),
        Err(err) => rejected_or(app, &err, &here)
            .map(Err)
            .ok_or_else(|| anyhow::Error::new(err).context("Failed to load dashboard data")),
    }
}

fn rejected_or(app: &App, err: &ApiError, here: &Route) -> Option<Route> {
    app.session().sign_in_if_rejected(err, here)
}

pub async fn list(app: &App) -> Result<Option<Route>> {
    let registry = match load(app).await? {
        Ok(registry) => registry,
        Err(route) => return Ok(Some(route)),
    };
    print_registry(&registry);
    Ok(None)
}

pub fn print_registry(registry: &Registry) {
    if let Some(user) = registry.user() {
        println!("Signed in as {}", user.email_id);
    }

    let entries = registry.entries();
    if entries.is_empty() {
        println!("You don't have any QR codes yet. Create one with `foundee codes create`.");
    } else {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(["ID", "Status", "Edit", "Viewer URL"]);
        for entry in &entries {
            let status = if entry.code.is_claimed() {
                "claimed"
            } else {
                "unclaimed"
            };
            table.add_row(vec![
                entry.code.id.clone(),
                status.to_string(),
                entry.edit_route.to_path(),
                entry.viewer_url.clone(),
            ]);
        }
        println!("{table}");
    }
    println!("Update my details: {}", registry.details_route());
}

pub async fn create(app: &App) -> Result<Option<Route>> {
    let mut registry = match load(app).await? {
        Ok(registry) => registry,
        Err(route) => return Ok(Some(route)),
    };
    match registry.create_unbound().await {
        Ok(code) => println!("Created QR code {}", code.id),
        Err(err) => {
            if let Some(route) = rejected_or(app, &err, &Route::Registry) {
                return Ok(Some(route));
            }
            return Err(anyhow::Error::new(err).context("Failed to create QR code"));
        }
    }
    print_registry(&registry);
    Ok(None)
}

pub fn download(app: &App, code_id: &str, out: Option<&Path>) -> Result<Option<Route>> {
    let registry = Registry::new(app.client.clone(), app.origin.clone());
    let rendered = registry.render_downloadable(code_id)?;

    let target = match out {
        Some(path) if path.is_dir() => path.join(&rendered.file_name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(&rendered.file_name),
    };
    fs::write(&target, &rendered.png)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    println!("Saved {} ({})", target.display(), rendered.url);
    Ok(None)
}
