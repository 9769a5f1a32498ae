//! The signed-in user's QR codes.
//!
//! The list is fetched fresh on every [`Registry::load`]; nothing is cached
//! between views.

use anyhow::Result;
use foundee_types::{QrCode, User};
use url::Url;

use crate::api::{ApiClient, ApiError};
use crate::qr_image::{self, RenderedQr};
use crate::routes::Route;

/// Placeholder id used by the "update my details" action when the user owns
/// no codes yet.
pub const NEW_CODE_ID: &str = "new";

/// One row of the registry view.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub code: QrCode,
    pub edit_route: Route,
    pub viewer_url: String,
}

pub struct Registry {
    client: ApiClient,
    origin: Url,
    user: Option<User>,
    codes: Vec<QrCode>,
}

impl Registry {
    pub fn new(client: ApiClient, origin: Url) -> Self {
        Self {
            client,
            origin,
            user: None,
            codes: Vec::new(),
        }
    }

    /// Fetches the account and its codes concurrently. Both must succeed.
    ///
    /// # Errors
    /// Returns the first backend failure; the view keeps its previous state.
    pub async fn load(&mut self) -> Result<(), ApiError> {
        let (user, codes) =
            futures_util::try_join!(self.client.me(), self.client.my_qr_codes())?;
        tracing::debug!(codes = codes.len(), "registry loaded");
        self.user = Some(user);
        self.codes = codes;
        Ok(())
    }

    /// Requests a new unbound code and appends it to the list.
    ///
    /// # Errors
    /// Returns the backend failure; the list is unchanged.
    pub async fn create_unbound(&mut self) -> Result<QrCode, ApiError> {
        let code = self.client.create_qr().await?;
        tracing::info!(code_id = %code.id, "created QR code");
        self.codes.push(code.clone());
        Ok(code)
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn codes(&self) -> &[QrCode] {
        &self.codes
    }

    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.codes
            .iter()
            .map(|code| RegistryEntry {
                edit_route: Route::editor(code.id.clone(), false),
                viewer_url: qr_image::viewer_url(&self.origin, &code.id),
                code: code.clone(),
            })
            .collect()
    }

    /// Renders the download image for `code_id`.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn render_downloadable(&self, code_id: &str) -> Result<RenderedQr> {
        qr_image::render_downloadable(&self.origin, code_id)
    }

    /// Editor route for the "update my details" action.
    pub fn details_route(&self) -> Route {
        let code_id = self.codes.first().map_or(NEW_CODE_ID, |code| code.id.as_str());
        Route::editor(code_id, false)
    }
}
