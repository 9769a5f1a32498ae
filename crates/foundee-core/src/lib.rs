//! Core Foundee client library (config, session, backend client, flows).

pub mod api;
pub mod auth;
pub mod config;
pub mod editor;
pub mod notice;
pub mod qr_image;
pub mod registry;
pub mod routes;
pub mod scan;
pub mod session;
pub mod viewer;
