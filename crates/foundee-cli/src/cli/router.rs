//! Follows the route a command hands back.
//!
//! Each hop shows one screen. Screens can hand back another route (a viewer
//! claiming a code leads to the editor, an expired session leads to sign-in),
//! so the loop is bounded.

use anyhow::{Result, bail};
use foundee_core::routes::Route;

use super::commands::{self, App};
use super::EditArgs;

const MAX_HOPS: usize = 4;

pub async fn follow(app: &App, route: Route) -> Result<()> {
    let mut next = Some(route);
    for _ in 0..MAX_HOPS {
        let Some(route) = next.take() else {
            return Ok(());
        };
        tracing::debug!(%route, "showing route");
        next = show(app, route).await?;
    }
    if let Some(route) = next {
        bail!("Too many redirects (stopped at {route})");
    }
    Ok(())
}

async fn show(app: &App, route: Route) -> Result<Option<Route>> {
    match route {
        Route::SignIn => {
            sign_in_hint(app);
            Ok(None)
        }
        Route::Registry => commands::codes::list(app).await,
        Route::Scanner => {
            println!("Scan a code: foundee scan --image <FILE> | --payload <URL> | --id <ID>");
            Ok(None)
        }
        Route::Viewer { code_id, coords } => {
            commands::view::run(app, &code_id, coords, false).await
        }
        Route::Editor { code_id, bind } => {
            let args = EditArgs {
                id: code_id,
                bind,
                ..EditArgs::default()
            };
            commands::edit::run(app, &args).await
        }
    }
}

fn sign_in_hint(app: &App) {
    eprintln!("Sign in required. Run `foundee login --id-token <TOKEN>` or `foundee login --email <EMAIL>`.");
    if let Some(pending) = app.session().pending_destination() {
        eprintln!("You will be returned to {pending} afterwards.");
    }
}
