//! Config command handlers.

use anyhow::{Context, Result};
use foundee_core::config;

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn show() -> Result<()> {
    let config_path = config::paths::config_path();
    let config = config::Config::load_from(&config_path).context("load config")?;

    println!("config:       {}", config_path.display());
    println!("session:      {}", config::paths::session_path().display());
    println!("api_url:      {}", config.effective_api_url()?);
    println!("origin:       {}", config.effective_origin()?);
    match config.request_timeout() {
        Some(timeout) => println!("timeout:      {}s", timeout.as_secs()),
        None => println!("timeout:      none"),
    }

    let geo = &config.geolocation;
    let location = match (geo.latitude, geo.longitude, geo.lookup_url.as_deref()) {
        (Some(lat), Some(lng), _) => format!("fixed {lat}, {lng}"),
        (_, _, Some(url)) => format!("lookup {url}"),
        _ => "none".to_string(),
    };
    println!("geolocation:  {location} (wait {}ms)", geo.timeout_ms);
    Ok(())
}
