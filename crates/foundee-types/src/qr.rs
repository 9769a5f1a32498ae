//! QR code records and scan results.

use serde::{Deserialize, Serialize};

use crate::details::{ContactEntry, DetailField, UserDetails, VisibilityMask};

fn default_active() -> bool {
    true
}

/// A QR code as returned by the registry endpoints.
///
/// `user_dtls_id` is the owning-user reference; `None` means the code is
/// unclaimed. The mask is present whether or not the code is bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCode {
    pub id: String,
    #[serde(default)]
    pub user_dtls_id: Option<String>,
    #[serde(default = "default_active")]
    pub active_flag: bool,
    #[serde(flatten)]
    pub mask: VisibilityMask,
}

impl QrCode {
    pub fn is_claimed(&self) -> bool {
        self.user_dtls_id.is_some()
    }
}

/// Latitude/longitude captured when a code was scanned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// The finder-facing projection of a code and its owner's details.
///
/// The backend has already dropped masked fields from `user_details`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub qr_id: Option<String>,
    #[serde(default)]
    pub user_dtls_id: Option<String>,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub user_details: Option<UserDetails>,
}

impl ScanResult {
    pub fn is_claimed(&self) -> bool {
        self.user_dtls_id.is_some()
    }

    /// Non-empty fields in display order. Fields absent from the payload are
    /// omitted rather than rendered blank.
    pub fn contact(&self) -> Vec<ContactEntry> {
        let Some(details) = &self.user_details else {
            return Vec::new();
        };
        DetailField::ALL
            .into_iter()
            .filter_map(|field| {
                details.non_empty(field).map(|value| ContactEntry {
                    field,
                    value: value.to_string(),
                })
            })
            .collect()
    }
}
