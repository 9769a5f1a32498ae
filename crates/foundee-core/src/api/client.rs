//! HTTP client for the Foundee backend.
//!
//! Every request carries the session credential as a bearer token when one
//! exists. Any call answered with 401, sign-in included, clears the session
//! credential before the error reaches the caller.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use foundee_types::{Coordinates, QrCode, ScanResult, User, UserDetails, VisibilityMask};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::ApiError;
use crate::config::Config;
use crate::session::Session;

/// Body returned by both sign-in endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Serialize)]
struct GoogleLoginRequest<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct PasswordLoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct CreateQrRequest {}

/// Whether a call presents the session credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Anonymous,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: Session,
}

impl ApiClient {
    /// Creates a client rooted at `base_url` (e.g. `http://localhost:8000/api`).
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, session: Session, timeout: Option<Duration>) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("Invalid api_url: {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("Invalid api_url: {base_url}");
        }

        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "foundee/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base,
            session,
        })
    }

    /// Creates a client from resolved configuration.
    ///
    /// # Errors
    /// Returns an error if the configured URL is invalid.
    pub fn from_config(config: &Config, session: Session) -> Result<Self> {
        let base_url = config.effective_api_url()?;
        Self::new(&base_url, session, config.request_timeout())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // Auth

    pub async fn google_login(&self, id_token: &str) -> Result<TokenResponse, ApiError> {
        let req = self
            .request(Method::POST, &["auth", "google-login"], Auth::Anonymous)
            .json(&GoogleLoginRequest { token: id_token });
        self.send(req).await
    }

    pub async fn password_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, ApiError> {
        let req = self
            .request(Method::POST, &["auth", "login"], Auth::Anonymous)
            .json(&PasswordLoginRequest { email, password });
        self.send(req).await
    }

    // User

    pub async fn me(&self) -> Result<User, ApiError> {
        let req = self.request(Method::GET, &["user", "me"], Auth::Bearer);
        self.send(req).await
    }

    pub async fn user_details(&self) -> Result<UserDetails, ApiError> {
        let req = self.request(Method::GET, &["user", "details"], Auth::Bearer);
        self.send(req).await
    }

    pub async fn update_user_details(
        &self,
        details: &UserDetails,
    ) -> Result<UserDetails, ApiError> {
        let req = self
            .request(Method::PUT, &["user", "details"], Auth::Bearer)
            .json(details);
        self.send(req).await
    }

    // QR codes

    pub async fn create_qr(&self) -> Result<QrCode, ApiError> {
        let req = self
            .request(Method::POST, &["qr", "create"], Auth::Bearer)
            .json(&CreateQrRequest {});
        self.send(req).await
    }

    pub async fn my_qr_codes(&self) -> Result<Vec<QrCode>, ApiError> {
        let req = self.request(Method::GET, &["qr", "my-qr-codes"], Auth::Bearer);
        self.send(req).await
    }

    /// Looks a code up as a finder. Coordinates are forwarded for owner
    /// notification and omitted when unknown.
    pub async fn scan(
        &self,
        code_id: &str,
        coords: Option<Coordinates>,
    ) -> Result<ScanResult, ApiError> {
        let mut url = self.endpoint(&["qr", "scan", code_id]);
        if let Some(c) = coords {
            url.query_pairs_mut()
                .append_pair("latitude", &c.latitude.to_string())
                .append_pair("longitude", &c.longitude.to_string());
        }
        let req = self.authorize(self.http.get(url), Auth::Bearer);
        self.send(req).await
    }

    pub async fn qr_details(&self, code_id: &str) -> Result<QrCode, ApiError> {
        let req = self.request(Method::GET, &["qr", "details", code_id], Auth::Bearer);
        self.send(req).await
    }

    pub async fn update_permissions(
        &self,
        code_id: &str,
        mask: &VisibilityMask,
    ) -> Result<QrCode, ApiError> {
        let req = self
            .request(
                Method::PUT,
                &["qr", "update-permissions", code_id],
                Auth::Bearer,
            )
            .json(mask);
        self.send(req).await
    }

    /// Claims an unbound code. A 400 means it already has an owner.
    pub async fn bind(&self, code_id: &str) -> Result<QrCode, ApiError> {
        let req = self.request(Method::PUT, &["qr", "bind", code_id], Auth::Bearer);
        self.send(req).await
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str], auth: Auth) -> RequestBuilder {
        let url = self.endpoint(segments);
        self.authorize(self.http.request(method, url), auth)
    }

    fn authorize(&self, req: RequestBuilder, auth: Auth) -> RequestBuilder {
        match (auth, self.session.credential()) {
            (Auth::Bearer, Some(token)) => req.bearer_auth(token),
            _ => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let response = req.send().await.map_err(|e| {
            tracing::debug!(error = %e, "request failed");
            ApiError::transport(&e)
        })?;

        let status = response.status();
        let url = response.url().path().to_string();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::http_status(status.as_u16(), &body);
            tracing::debug!(path = %url, status = status.as_u16(), "backend returned error");
            if err.is_unauthorized() {
                self.session.expire();
            }
            return Err(err);
        }

        let bytes = response.bytes().await.map_err(|e| ApiError::transport(&e))?;
        tracing::trace!(path = %url, bytes = bytes.len(), "backend response");
        serde_json::from_slice(&bytes).map_err(ApiError::parse)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::ApiErrorKind;
    use crate::test_support::{can_bind_localhost, client_for};

    #[test]
    fn test_endpoint_joins_segments_under_base_path() {
        let client = ApiClient::new("http://localhost:8000/api/", Session::in_memory(), None).unwrap();
        assert_eq!(
            client.endpoint(&["qr", "scan", "a b"]).as_str(),
            "http://localhost:8000/api/qr/scan/a%20b"
        );
    }

    #[test]
    fn test_new_rejects_invalid_base() {
        assert!(ApiClient::new("not a url", Session::in_memory(), None).is_err());
        assert!(ApiClient::new("mailto:x@example.com", Session::in_memory(), None).is_err());
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/me"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "u1", "email_id": "ada@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("tok-1"));
        let user = client.me().await.unwrap();
        assert_eq!(user.email_id, "ada@example.com");
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/qr/my-qr-codes"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"detail": "Invalid token"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Some("expired"));
        let err = client.my_qr_codes().await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Unauthorized);
        assert!(!client.session().is_signed_in());
    }

    #[tokio::test]
    async fn test_failed_sign_in_clears_existing_session() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(serde_json::json!({"email": "a@b.c", "password": "nope"})))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "Incorrect email or password"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Some("old-token"));
        let err = client.password_login("a@b.c", "nope").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(client.session().credential(), None);
    }

    #[tokio::test]
    async fn test_scan_forwards_coordinates() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/qr/scan/abc"))
            .and(query_param("latitude", "51.5"))
            .and(query_param("longitude", "-0.12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "qr_id": "abc", "user_dtls_id": null, "user_details": null, "is_owner": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let coords = Coordinates {
            latitude: 51.5,
            longitude: -0.12,
        };
        let scan = client.scan("abc", Some(coords)).await.unwrap();
        assert!(!scan.is_claimed());
    }

    #[tokio::test]
    async fn test_parse_error_on_unexpected_body() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/details"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("tok"));
        let err = client.user_details().await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }
}
