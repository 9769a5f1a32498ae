//! Client routes.
//!
//! Every screen transition is expressed as a [`Route`]. Routes render to the
//! same path strings the web client uses (`/qr/<id>?lat=..&lng=..`,
//! `/update/<id>?bind=true`) so a remembered destination survives a sign-in
//! round trip unchanged.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use foundee_types::Coordinates;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::{Url, form_urlencoded};

/// Base used only to parse relative route strings.
const ROUTE_BASE: &str = "http://foundee.invalid";

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Sign-in entry point.
    SignIn,
    /// The signed-in user's QR codes.
    Registry,
    /// Camera or manual entry.
    Scanner,
    /// Finder view of a code, with optional scan coordinates.
    Viewer {
        code_id: String,
        coords: Option<Coordinates>,
    },
    /// Details/visibility editor, optionally claiming the code first.
    Editor { code_id: String, bind: bool },
}

impl Route {
    pub fn viewer(code_id: impl Into<String>, coords: Option<Coordinates>) -> Self {
        Route::Viewer {
            code_id: code_id.into(),
            coords,
        }
    }

    pub fn editor(code_id: impl Into<String>, bind: bool) -> Self {
        Route::Editor {
            code_id: code_id.into(),
            bind,
        }
    }

    /// Renders the route as a path with query string.
    pub fn to_path(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        let path = match self {
            Route::SignIn => "/login".to_string(),
            Route::Registry => "/dashboard".to_string(),
            Route::Scanner => "/scan".to_string(),
            Route::Viewer { code_id, coords } => {
                if let Some(c) = coords {
                    query
                        .append_pair("lat", &c.latitude.to_string())
                        .append_pair("lng", &c.longitude.to_string());
                }
                encode_path(&["qr", code_id])
            }
            Route::Editor { code_id, bind } => {
                if *bind {
                    query.append_pair("bind", "true");
                }
                encode_path(&["update", code_id])
            }
        };
        let query = query.finish();
        if query.is_empty() {
            path
        } else {
            format!("{path}?{query}")
        }
    }

    /// Whether the route needs a session credential.
    pub fn requires_session(&self) -> bool {
        matches!(self, Route::Registry | Route::Editor { .. })
    }
}

/// Characters escaped inside one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn encode_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| format!("/{}", utf8_percent_encode(segment, SEGMENT)))
        .collect()
}

/// Percent-decodes one path segment.
pub(crate) fn decode_segment(segment: &str) -> String {
    percent_encoding::percent_decode_str(segment)
        .decode_utf8_lossy()
        .into_owned()
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

impl FromStr for Route {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            bail!("empty route");
        }
        let base = Url::parse(ROUTE_BASE).context("route base")?;
        let url = base
            .join(trimmed)
            .with_context(|| format!("invalid route '{trimmed}'"))?;

        let segments: Vec<String> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).map(decode_segment).collect())
            .unwrap_or_default();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let query = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };

        let route = match segments.as_slice() {
            [] | ["scan"] => Route::Scanner,
            ["login"] => Route::SignIn,
            ["dashboard"] => Route::Registry,
            ["qr", code_id] => {
                let lat = query("lat").and_then(|v| v.parse::<f64>().ok());
                let lng = query("lng").and_then(|v| v.parse::<f64>().ok());
                let coords = match (lat, lng) {
                    (Some(latitude), Some(longitude)) => Some(Coordinates {
                        latitude,
                        longitude,
                    }),
                    _ => None,
                };
                Route::viewer(*code_id, coords)
            }
            ["update", code_id] => {
                let bind = query("bind").is_some_and(|v| v == "true");
                Route::editor(*code_id, bind)
            }
            _ => bail!("unknown route '{trimmed}'"),
        };
        Ok(route)
    }
}
