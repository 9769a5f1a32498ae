//! Scan command handler.

use anyhow::Result;
use foundee_core::routes::Route;
use foundee_core::scan::{self, FixedLocation, Geolocator, ImageCapture, NoLocation, ScanFlow};

use super::{App, print_notice};
use crate::cli::ScanArgs;

pub async fn run(app: &App, args: &ScanArgs) -> Result<Option<Route>> {
    let mut flow = ScanFlow::new();

    let route = if let Some(id) = args.id.as_deref() {
        flow.submit_manual(id)
    } else {
        let geo = geolocator(app, args)?;
        let timeout = app.config.geolocation.timeout();
        if let Some(payload) = args.payload.as_deref() {
            flow.handle_payload(payload, geo.as_ref(), timeout).await
        } else {
            flow.begin_capture(Box::new(ImageCapture::new(args.image.iter().cloned())))?;
            flow.capture(geo.as_ref(), timeout).await?
        }
    };

    if let Some(notice) = flow.take_notice() {
        print_notice(&notice);
    }
    match route {
        Some(route) => Ok(Some(route)),
        None => {
            println!("Nothing to show. Try another image or enter the code id with `foundee scan --id <ID>`.");
            Ok(None)
        }
    }
}

fn geolocator(app: &App, args: &ScanArgs) -> Result<Box<dyn Geolocator>> {
    if args.no_location {
        return Ok(Box::new(NoLocation));
    }
    if let Some(coords) = args.location.coordinates() {
        return Ok(Box::new(FixedLocation(coords)));
    }
    scan::geo::from_config(&app.config.geolocation)
}
