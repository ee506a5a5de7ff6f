//! End-to-end session flow against a mock backend.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &std::path::Path, backend: &str) {
    fs::write(
        dir.join("config.toml"),
        format!(
            "[backend]\nauth_base_url = \"{backend}/api/auth\"\napi_base_url = \"{backend}/api\"\n"
        ),
    )
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_whoami_logout_flow() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    write_config(dir.path(), &server.uri());

    Mock::given(method("POST"))
        .and(path("/api/auth/users/login/"))
        .and(body_json(json!({"email": "john@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Login successful",
            "access": "A1", "refresh": "R1",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/users/profile/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "email": "john@example.com",
            "first_name": "John", "last_name": "Doe",
            "profile": {},
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/users/logout/"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Successfully logged out",
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("crmx")
        .env("CRMX_HOME", dir.path())
        .args(["login", "--email", "john@example.com", "--password", "pw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as John Doe"));

    assert!(dir.path().join("session.json").exists());

    cargo_bin_cmd!("crmx")
        .env("CRMX_HOME", dir.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("John Doe <john@example.com>"));

    cargo_bin_cmd!("crmx")
        .env("CRMX_HOME", dir.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));

    assert!(!dir.path().join("session.json").exists());
}

#[test]
fn test_whoami_without_session() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("crmx")
        .env("CRMX_HOME", dir.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_failure_reports_backend_message() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    write_config(dir.path(), &server.uri());

    Mock::given(method("POST"))
        .and(path("/api/auth/users/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials",
        })))
        .mount(&server)
        .await;

    cargo_bin_cmd!("crmx")
        .env("CRMX_HOME", dir.path())
        .args(["login", "--email", "john@example.com", "--password", "bad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "No active account found with the given credentials",
        ));

    assert!(!dir.path().join("session.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deals_list_uses_configured_webhook() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;
    fs::write(
        dir.path().join("config.toml"),
        format!(
            "[bitrix]\nwebhook_url = \"{}/rest/1/secret\"\n",
            server.uri()
        ),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/1/secret/crm.deal.list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                {"ID": "7", "TITLE": "Order #7", "STAGE_ID": "UC_3MCI1C",
                 "OPPORTUNITY": "150.00", "CURRENCY_ID": "USD",
                 "DATE_CREATE": "2026-03-01T10:15:00+03:00"},
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("crmx")
        .env("CRMX_HOME", dir.path())
        .args(["deals", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Order #7"))
        .stdout(predicate::str::contains("150.00 USD"))
        .stdout(predicate::str::contains("2026-03-01"));
}

#[test]
fn test_deals_list_without_webhook_fails() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("crmx")
        .env("CRMX_HOME", dir.path())
        .args(["deals", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No Bitrix24 webhook configured"));
}
