//! End-to-end flows against a mocked backend.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    let ok = std::net::TcpListener::bind("127.0.0.1:0").is_ok();
    if !ok {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
    }
    ok
}

fn foundee(home: &Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("foundee");
    cmd.env("FOUNDEE_HOME", home)
        .env("FOUNDEE_API_URL", format!("{}/api", server.uri()))
        .env("FOUNDEE_ORIGIN", "https://foundee.example")
        .env("FOUNDEE_NO_BROWSER", "1")
        .env_remove("FOUNDEE_LOG");
    cmd
}

fn session_json(home: &Path) -> serde_json::Value {
    let contents = fs::read_to_string(home.join("session.json")).unwrap();
    serde_json::from_str(&contents).unwrap()
}

fn unbound_code(id: &str) -> serde_json::Value {
    json!({"id": id, "user_dtls_id": null, "active_flag": true})
}

#[tokio::test]
async fn test_claim_after_sign_in_returns_to_editor() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/qr/scan/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "qr_id": "abc", "user_dtls_id": null, "user_details": null, "is_owner": false
        })))
        .mount(&server)
        .await;

    foundee(home.path(), &server)
        .args(["view", "abc", "--claim"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Sign in required"))
        .stderr(predicate::str::contains("/update/abc?bind=true"));

    let saved = session_json(home.path());
    assert_eq!(saved["return_to"], "/update/abc?bind=true");
    assert!(saved.get("access_token").is_none());

    Mock::given(method("POST"))
        .and(path("/api/auth/google-login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1", "token_type": "bearer"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/qr/bind/abc"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc", "user_dtls_id": "d1", "active_flag": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "first_name": "Ada", "mobile_no": "555-0100"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/qr/details/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc", "user_dtls_id": "d1", "mobile_no": false
        })))
        .mount(&server)
        .await;

    foundee(home.path(), &server)
        .args(["login", "--id-token", "google-id-token"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in."))
        .stdout(predicate::str::contains("QR Code claimed successfully!"))
        .stdout(predicate::str::contains("Ada"))
        .stdout(predicate::str::contains("Hidden"));

    let saved = session_json(home.path());
    assert_eq!(saved["access_token"], "tok-1");
    assert!(saved.get("return_to").is_none());
}

#[tokio::test]
async fn test_scan_payload_shows_visible_contact() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/qr/scan/xyz"))
        .and(query_param("latitude", "10.5"))
        .and(query_param("longitude", "-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "qr_id": "xyz",
            "user_dtls_id": "d9",
            "is_owner": false,
            "user_details": {"first_name": "Grace", "email_id": "grace@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    foundee(home.path(), &server)
        .args([
            "scan",
            "--payload",
            "https://foundee.example/qr/xyz",
            "--lat",
            "10.5",
            "--lng",
            "-3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("First Name: Grace"))
        .stdout(predicate::str::contains("Email: grace@example.com"))
        .stdout(predicate::str::contains("with your location"));
}

#[tokio::test]
async fn test_scan_downloaded_image_round_trip() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    foundee(home.path(), &server)
        .args(["codes", "download", "q42", "--out"])
        .arg(home.path())
        .assert()
        .success();

    Mock::given(method("GET"))
        .and(path("/api/qr/scan/q42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "qr_id": "q42", "user_dtls_id": null, "user_details": null, "is_owner": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    foundee(home.path(), &server)
        .args(["scan", "--no-location", "--image"])
        .arg(home.path().join("foundee-qr-q42.png"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Unclaimed QR Code"));
}

#[tokio::test]
async fn test_scan_rejects_foreign_payload() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    foundee(home.path(), &server)
        .args(["scan", "--no-location", "--payload", "not a code"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Invalid QR code"));
}

#[tokio::test]
async fn test_rejected_session_redirects_to_sign_in() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    fs::write(
        home.path().join("session.json"),
        r#"{"access_token": "stale"}"#,
    )
    .unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Could not validate credentials"
        })))
        .mount(&server)
        .await;

    foundee(home.path(), &server)
        .args(["codes", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Sign in required"));

    let saved = session_json(home.path());
    assert!(saved.get("access_token").is_none());
    assert_eq!(saved["return_to"], "/dashboard");
}

#[tokio::test]
async fn test_codes_list_requires_session() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    foundee(home.path(), &server)
        .args(["codes", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Sign in required"));

    assert_eq!(session_json(home.path())["return_to"], "/dashboard");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_codes_list_prints_table() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    fs::write(home.path().join("session.json"), r#"{"access_token": "tok"}"#).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/user/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1", "email_id": "ada@example.com", "name": "Ada"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/qr/my-qr-codes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "c1", "user_dtls_id": "d1", "active_flag": true},
            unbound_code("c2"),
        ])))
        .mount(&server)
        .await;

    foundee(home.path(), &server)
        .args(["codes", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ada@example.com"))
        .stdout(predicate::str::contains("unclaimed"))
        .stdout(predicate::str::contains("https://foundee.example/qr/c2"));
}

#[tokio::test]
async fn test_rejected_login_signs_out() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    fs::write(home.path().join("session.json"), r#"{"access_token": "old-token"}"#).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/google-login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Invalid Google token"
        })))
        .mount(&server)
        .await;

    foundee(home.path(), &server)
        .args(["login", "--force", "--id-token", "bad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("try again"));

    assert!(!home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_logout_forgets_pending_destination() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    fs::write(
        home.path().join("session.json"),
        r#"{"access_token": "tok", "return_to": "/update/abc?bind=true"}"#,
    )
    .unwrap();

    foundee(home.path(), &server)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out."));

    assert!(!home.path().join("session.json").exists());
}
