//! Viewer command handler.

use anyhow::{Result, bail};
use foundee_core::routes::Route;
use foundee_core::viewer::{QrViewer, ViewerStep, ViewerView};
use foundee_types::Coordinates;

use super::App;

pub async fn run(
    app: &App,
    code_id: &str,
    coords: Option<Coordinates>,
    claim: bool,
) -> Result<Option<Route>> {
    let mut viewer = QrViewer::new(app.client.clone(), code_id, coords);
    match viewer.resolve().await {
        ViewerStep::Shown => {}
        ViewerStep::Redirect(route) => return Ok(Some(route)),
        ViewerStep::Stale => return Ok(None),
    }

    match viewer.view() {
        ViewerView::Loading => {}
        ViewerView::Unclaimed => {
            if claim {
                return Ok(viewer.claim());
            }
            println!("Unclaimed QR Code");
            println!("This QR code hasn't been claimed yet. Be the first to claim it!");
            println!("Claim it with: foundee view {code_id} --claim");
        }
        ViewerView::Claimed {
            contact,
            location_shared,
        } => {
            println!("Contact Information");
            println!("Please help return the lost item to its owner.");
            println!();
            if contact.is_empty() {
                println!("No contact information available.");
            }
            for entry in contact {
                println!("  {}: {}", entry.field.label(), entry.value);
            }
            println!();
            if *location_shared {
                println!("The owner has been notified via email with your location.");
            } else {
                println!("The owner has been notified via email.");
            }
            if claim {
                println!("This QR code is already claimed.");
            }
        }
        ViewerView::Failed { message } => {
            println!("Scan another code: foundee open {}", viewer.back());
            bail!("{message}");
        }
    }
    Ok(None)
}
