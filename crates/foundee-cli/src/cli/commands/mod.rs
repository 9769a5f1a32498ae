//! CLI command handlers.
//!
//! Handlers return the next route to show, if any; dispatch follows it.

pub mod auth;
pub mod codes;
pub mod config;
pub mod edit;
pub mod open;
pub mod scan;
pub mod view;

use anyhow::Result;
use foundee_core::api::ApiClient;
use foundee_core::config::Config;
use foundee_core::notice::{Notice, NoticeLevel};
use foundee_core::qr_image;
use foundee_core::session::Session;
use url::Url;

/// Everything a command needs: resolved config, the session, and a client.
pub struct App {
    pub config: Config,
    pub client: ApiClient,
    pub origin: Url,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let session = Session::load()?;
        let client = ApiClient::from_config(&config, session)?;
        let origin = qr_image::parse_origin(&config.effective_origin()?)?;
        tracing::debug!(api = %client.base_url(), origin = %origin, "client ready");
        Ok(Self {
            config,
            client,
            origin,
        })
    }

    pub fn session(&self) -> &Session {
        self.client.session()
    }
}

pub fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Success | NoticeLevel::Info => println!("{}", notice.message),
        NoticeLevel::Error => eprintln!("{}", notice.message),
    }
}
