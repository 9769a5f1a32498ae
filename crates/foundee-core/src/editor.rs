//! Claim-and-edit flow.
//!
//! [`ClaimEditor::open`] optionally binds the code to the signed-in user,
//! then loads the user's details and the code's visibility mask together.
//! The loaded [`DetailsEditor`] edits both and saves them as two
//! consecutive writes. Neither sequence is transactional: a failure part
//! way through is reported and the caller retries the whole operation.

use std::fmt;

use enum_map::EnumMap;
use foundee_types::{ContactEntry, DetailField, UserDetails, VisibilityMask, visible_contact};

use crate::api::{ApiClient, ApiError, ApiErrorKind};
use crate::notice::Notice;
use crate::routes::Route;

pub const CLAIMED: &str = "QR Code claimed successfully! Now add your details.";
pub const ALREADY_CLAIMED: &str = "This QR is already claimed. Loading your details...";
pub const SAVED: &str = "Details and permissions updated successfully!";

/// Editable copy of a user's details and one code's mask.
///
/// Values and visibility are stored separately; changing one never touches
/// the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailsForm {
    values: EnumMap<DetailField, String>,
    visible: EnumMap<DetailField, bool>,
    saved_values: EnumMap<DetailField, String>,
    saved_visible: EnumMap<DetailField, bool>,
}

impl DetailsForm {
    /// Seeds the form. Missing values become empty strings.
    pub fn from_loaded(details: &UserDetails, mask: &VisibilityMask) -> Self {
        let values = EnumMap::from_fn(|field| details.get(field).unwrap_or_default().to_string());
        let visible = mask.to_map();
        Self {
            saved_values: values.clone(),
            saved_visible: visible,
            values,
            visible,
        }
    }

    pub fn value(&self, field: DetailField) -> &str {
        &self.values[field]
    }

    pub fn set_value(&mut self, field: DetailField, value: impl Into<String>) {
        self.values[field] = value.into();
    }

    pub fn is_visible(&self, field: DetailField) -> bool {
        self.visible[field]
    }

    pub fn set_visible(&mut self, field: DetailField, visible: bool) {
        self.visible[field] = visible;
    }

    pub fn toggle_visibility(&mut self, field: DetailField) {
        self.visible[field] = !self.visible[field];
    }

    /// Details as they will be written. Every field is sent.
    pub fn to_details(&self) -> UserDetails {
        let mut details = UserDetails::default();
        for (field, value) in &self.values {
            details.set(field, Some(value.clone()));
        }
        details
    }

    pub fn to_mask(&self) -> VisibilityMask {
        VisibilityMask::from_map(&self.visible)
    }

    /// What a finder would see once saved.
    pub fn preview(&self) -> Vec<ContactEntry> {
        visible_contact(&self.to_details(), &self.to_mask())
    }

    /// Whether anything differs from what was loaded or last saved.
    pub fn is_dirty(&self) -> bool {
        self.values != self.saved_values || self.visible != self.saved_visible
    }

    fn mark_saved(&mut self) {
        self.saved_values = self.values.clone();
        self.saved_visible = self.visible;
    }
}

/// The bind or load step failed.
#[derive(Debug)]
pub struct LoadError {
    pub source: ApiError,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source.kind {
            ApiErrorKind::Forbidden
            | ApiErrorKind::NotFound
            | ApiErrorKind::BadRequest
            | ApiErrorKind::Unauthorized => write!(
                f,
                "Failed to load data. Make sure you own this QR code. ({})",
                self.source.user_message()
            ),
            ApiErrorKind::Transport | ApiErrorKind::Status | ApiErrorKind::Parse => write!(
                f,
                "Failed to load data ({}). Please try again.",
                self.source.user_message()
            ),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Which write of a save failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    /// Nothing was written.
    Details,
    /// Details were written; the mask was not.
    Permissions,
}

#[derive(Debug)]
pub struct SaveError {
    pub stage: SaveStage,
    pub source: ApiError,
    /// Set when the credential was rejected.
    pub redirect: Option<Route>,
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.stage {
            SaveStage::Details => "details were not saved",
            SaveStage::Permissions => "details were saved but visibility settings were not",
        };
        write!(
            f,
            "Failed to save changes ({what}: {}). Please try again.",
            self.source.user_message()
        )
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug)]
pub enum Opened {
    Ready(DetailsEditor),
    /// Sign-in is needed first; the editor route has been remembered.
    Redirect(Route),
}

/// Entry point of the editor route.
pub struct ClaimEditor {
    client: ApiClient,
    code_id: String,
    bind: bool,
}

impl ClaimEditor {
    pub fn new(client: ApiClient, code_id: impl Into<String>, bind: bool) -> Self {
        Self {
            client,
            code_id: code_id.into(),
            bind,
        }
    }

    pub fn route(&self) -> Route {
        Route::editor(self.code_id.clone(), self.bind)
    }

    /// Runs the optional bind step and the load step.
    ///
    /// # Errors
    /// Returns [`LoadError`] when binding fails for any reason other than the
    /// code already having an owner, or when either load fetch fails.
    pub async fn open(mut self) -> Result<Opened, LoadError> {
        let session = self.client.session().clone();
        if let Err(route) = session.require_for(&self.route()) {
            return Ok(Opened::Redirect(route));
        }

        let mut notice = None;
        if self.bind {
            match self.client.bind(&self.code_id).await {
                Ok(_) => {
                    tracing::info!(code_id = %self.code_id, "claimed QR code");
                    notice = Some(Notice::success(CLAIMED));
                }
                Err(err) if err.is_already_bound() => {
                    tracing::debug!(code_id = %self.code_id, "code already bound");
                    notice = Some(Notice::info(ALREADY_CLAIMED));
                }
                Err(err) => {
                    if let Some(route) = session.sign_in_if_rejected(&err, &self.route()) {
                        return Ok(Opened::Redirect(route));
                    }
                    return Err(LoadError { source: err });
                }
            }
            // Reloading from here should not attempt the claim again.
            self.bind = false;
        }

        let loaded = futures_util::try_join!(
            self.client.user_details(),
            self.client.qr_details(&self.code_id)
        );
        let (details, code) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                if let Some(route) = session.sign_in_if_rejected(&err, &self.route()) {
                    return Ok(Opened::Redirect(route));
                }
                return Err(LoadError { source: err });
            }
        };

        Ok(Opened::Ready(DetailsEditor {
            form: DetailsForm::from_loaded(&details, &code.mask),
            client: self.client,
            code_id: self.code_id,
            notice,
        }))
    }
}

/// A loaded editor.
#[derive(Debug)]
pub struct DetailsEditor {
    client: ApiClient,
    code_id: String,
    form: DetailsForm,
    notice: Option<Notice>,
}

impl DetailsEditor {
    pub fn code_id(&self) -> &str {
        &self.code_id
    }

    pub fn form(&self) -> &DetailsForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut DetailsForm {
        &mut self.form
    }

    /// Hands out the bind notice once.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Writes details, then the mask. Both must succeed.
    ///
    /// # Errors
    /// Returns [`SaveError`] naming the failed write. An earlier successful
    /// write is not rolled back.
    pub async fn save(&mut self) -> Result<Notice, SaveError> {
        let details = self.form.to_details();
        let mask = self.form.to_mask();

        if let Err(err) = self.client.update_user_details(&details).await {
            return Err(self.save_error(SaveStage::Details, err));
        }
        if let Err(err) = self.client.update_permissions(&self.code_id, &mask).await {
            return Err(self.save_error(SaveStage::Permissions, err));
        }

        self.form.mark_saved();
        tracing::info!(code_id = %self.code_id, "saved details and permissions");
        Ok(Notice::success(SAVED))
    }

    /// Discards edits. No backend call is made.
    pub fn cancel(self) -> Route {
        Route::Registry
    }

    fn save_error(&self, stage: SaveStage, source: ApiError) -> SaveError {
        tracing::warn!(code_id = %self.code_id, ?stage, error = %source, "save failed");
        let here = Route::editor(self.code_id.clone(), false);
        SaveError {
            stage,
            redirect: self.client.session().sign_in_if_rejected(&source, &here),
            source,
        }
    }
}

impl fmt::Debug for ClaimEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimEditor")
            .field("code_id", &self.code_id)
            .field("bind", &self.bind)
            .finish_non_exhaustive()
    }
}
