//! Route command handler.

use anyhow::{Context, Result};
use foundee_core::routes::Route;

use super::App;

/// Set to skip launching a browser (the URL is still printed).
const NO_BROWSER_ENV: &str = "FOUNDEE_NO_BROWSER";

pub fn run(app: &App, route: &str, browser: bool) -> Result<Option<Route>> {
    let route: Route = route.parse()?;
    if !browser {
        return Ok(Some(route));
    }

    let url = web_url(&app.origin, &route)?;
    println!("{url}");
    if std::env::var_os(NO_BROWSER_ENV).is_none() {
        open::that(url.as_str()).with_context(|| format!("Failed to open {url}"))?;
    }
    Ok(None)
}

fn web_url(origin: &url::Url, route: &Route) -> Result<url::Url> {
    origin
        .join(&route.to_path())
        .with_context(|| format!("Failed to build URL for {route}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_url_keeps_query() {
        let origin = url::Url::parse("https://foundee.example").unwrap();
        let url = web_url(&origin, &Route::editor("abc", true)).unwrap();
        assert_eq!(url.as_str(), "https://foundee.example/update/abc?bind=true");
    }
}
