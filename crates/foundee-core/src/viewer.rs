//! Finder-facing view of a scanned code.

use std::future::Future;

use foundee_types::{ContactEntry, Coordinates, ScanResult};

use crate::api::{ApiClient, ApiError};
use crate::routes::Route;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerView {
    Loading,
    /// No owner yet; the claim action is offered.
    Unclaimed,
    /// Visible, non-empty contact fields in display order. Empty when the
    /// owner shares nothing.
    Claimed {
        contact: Vec<ContactEntry>,
        /// Coordinates went along with the owner notification.
        location_shared: bool,
    },
    /// Lookup failed; [`QrViewer::back`] leads to the scanner.
    Failed { message: String },
}

/// What applying a lookup result did.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerStep {
    /// The view was updated and should be rendered.
    Shown,
    /// Leave without rendering.
    Redirect(Route),
    /// The response belonged to a superseded lookup and was ignored.
    Stale,
}

/// One scan lookup started by [`QrViewer::begin`].
///
/// Only the viewer's most recent lookup, for the code it is showing, may
/// update the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    code_id: String,
    seq: u64,
}

pub struct QrViewer {
    client: ApiClient,
    code_id: String,
    coords: Option<Coordinates>,
    view: ViewerView,
    issued: u64,
    pending: Option<u64>,
}

impl QrViewer {
    pub fn new(client: ApiClient, code_id: impl Into<String>, coords: Option<Coordinates>) -> Self {
        Self {
            client,
            code_id: code_id.into(),
            coords,
            view: ViewerView::Loading,
            issued: 0,
            pending: None,
        }
    }

    pub fn code_id(&self) -> &str {
        &self.code_id
    }

    pub fn route(&self) -> Route {
        Route::viewer(self.code_id.clone(), self.coords)
    }

    pub fn view(&self) -> &ViewerView {
        &self.view
    }

    /// Starts a lookup. Earlier lookups become stale.
    pub fn begin(&mut self) -> Lookup {
        self.view = ViewerView::Loading;
        self.issued += 1;
        self.pending = Some(self.issued);
        Lookup {
            code_id: self.code_id.clone(),
            seq: self.issued,
        }
    }

    /// The backend lookup for this code, detached from `self`.
    pub fn fetch(&self) -> impl Future<Output = Result<ScanResult, ApiError>> + Send + 'static {
        let client = self.client.clone();
        let code_id = self.code_id.clone();
        let coords = self.coords;
        async move { client.scan(&code_id, coords).await }
    }

    /// Applies a lookup result if `lookup` is still the current lookup.
    pub fn apply(&mut self, lookup: Lookup, result: Result<ScanResult, ApiError>) -> ViewerStep {
        if lookup.code_id != self.code_id || self.pending != Some(lookup.seq) {
            tracing::debug!(code_id = %lookup.code_id, "dropping stale scan result");
            return ViewerStep::Stale;
        }
        self.pending = None;

        let scan = match result {
            Ok(scan) => scan,
            Err(err) => {
                if let Some(route) = self.client.session().sign_in_if_rejected(&err, &self.route()) {
                    return ViewerStep::Redirect(route);
                }
                tracing::debug!(code_id = %self.code_id, error = %err, "scan lookup failed");
                self.view = ViewerView::Failed {
                    message: format!("Failed to load QR code information: {}", err.user_message()),
                };
                return ViewerStep::Shown;
            }
        };

        if scan.is_owner {
            return ViewerStep::Redirect(Route::editor(self.code_id.clone(), false));
        }

        self.view = if scan.is_claimed() {
            ViewerView::Claimed {
                contact: scan.contact(),
                location_shared: self.coords.is_some(),
            }
        } else {
            ViewerView::Unclaimed
        };
        ViewerStep::Shown
    }

    /// Looks the code up and applies the result.
    pub async fn resolve(&mut self) -> ViewerStep {
        let lookup = self.begin();
        let result = self.fetch().await;
        self.apply(lookup, result)
    }

    /// Marks the view as no longer displayed; in-flight results are ignored.
    pub fn leave(&mut self) {
        self.pending = None;
    }

    /// The claim action. Only available for unclaimed codes.
    ///
    /// Signed-in users go straight to the editor with bind intent; everyone
    /// else goes to sign-in with that destination remembered.
    pub fn claim(&self) -> Option<Route> {
        if self.view != ViewerView::Unclaimed {
            return None;
        }
        let destination = Route::editor(self.code_id.clone(), true);
        let session = self.client.session();
        if session.is_signed_in() {
            Some(destination)
        } else {
            Some(session.redirect_to_sign_in(Some(&destination)))
        }
    }

    /// Recovery path from any viewer state.
    pub fn back(&self) -> Route {
        Route::Scanner
    }
}
