//! Shared data model for the Foundee client.

pub mod details;
pub mod qr;
pub mod user;

pub use details::{
    ContactEntry, DEFAULT_VISIBLE, DetailField, UserDetails, VisibilityMask, visible_contact,
};
pub use qr::{Coordinates, QrCode, ScanResult};
pub use user::User;
