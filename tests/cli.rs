use std::path::Path;

use assert_cmd::Command;
use base64::Engine as _;
use predicates as pred;
use tempfile::TempDir;

#[path = "../src/test_support.rs"]
mod test_support;

use test_support::serve;

fn cmd(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dollardollar").unwrap();
    cmd.env("DOLLARDOLLAR_CONFIG_DIR", config_dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("HTTP_PROXY")
        .env_remove("HTTPS_PROXY")
        .env_remove("ALL_PROXY")
        .env_remove("http_proxy")
        .env_remove("https_proxy")
        .env_remove("all_proxy");
    cmd
}

fn init(dir: &TempDir) {
    cmd(dir.path())
        .args(["init", "--data-dir"])
        .arg(dir.path().join("data"))
        .assert()
        .success()
        .stdout(pred::str::contains("Initialized dollardollar"));
}

fn write_settings(dir: &TempDir, json: &str) {
    std::fs::write(dir.path().join("settings.json"), json).unwrap();
}

#[test]
fn init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    init(&dir);
    assert!(dir.path().join("data").join("dollardollar.db").exists());
    assert!(dir.path().join("settings.json").exists());
    assert!(!dir.path().join("data").join("exports").exists());
}

#[test]
fn accounts_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    init(&dir);
    cmd(dir.path())
        .args(["accounts", "add", "Joint Checking", "--institution", "Credit Union"])
        .assert()
        .success()
        .stdout(pred::str::contains("Added account: Joint Checking"));
    cmd(dir.path())
        .args(["accounts", "list"])
        .assert()
        .success()
        .stdout(pred::str::contains("Joint Checking"))
        .stdout(pred::str::contains("Credit Union"))
        .stdout(pred::str::contains("manual"));
}

#[test]
fn rules_reject_unknown_category() {
    let dir = tempfile::tempdir().unwrap();
    init(&dir);
    cmd(dir.path())
        .args(["rules", "add", "netflix", "--category", "Yachts"])
        .assert()
        .failure()
        .stderr(pred::str::contains("Unknown category: Yachts"));
}

#[test]
fn fetch_without_connection_fails() {
    let dir = tempfile::tempdir().unwrap();
    init(&dir);
    cmd(dir.path())
        .args(["simplefin", "fetch"])
        .assert()
        .failure()
        .stderr(pred::str::contains("Not configured"));
}

#[test]
fn claim_rejects_bad_token() {
    let dir = tempfile::tempdir().unwrap();
    init(&dir);
    cmd(dir.path())
        .args(["simplefin", "claim", "%%%"])
        .assert()
        .failure()
        .stderr(pred::str::contains("Invalid setup token"));
}

#[test]
fn access_redirects_demo_user() {
    let dir = tempfile::tempdir().unwrap();
    write_settings(
        &dir,
        r#"{"data_dir": "/tmp/unused", "auth": {"demo_users": ["demo@example.com"]}}"#,
    );
    cmd(dir.path())
        .args(["access", "/simplefin/connect", "--user", "demo@example.com"])
        .assert()
        .success()
        .stdout(pred::str::contains(
            "redirect to /dashboard: Demo users cannot access this feature",
        ));
    cmd(dir.path())
        .args(["access", "/transactions", "--user", "demo@example.com"])
        .assert()
        .success()
        .stdout(pred::str::contains("authorized: demo@example.com (via session, demo)"));
}

#[test]
fn access_dev_auto_login_and_tokens() {
    let dir = tempfile::tempdir().unwrap();
    write_settings(
        &dir,
        r#"{"data_dir": "/tmp/unused", "auth": {"mode": "dev_auto_login", "dev_user": "dev", "api_tokens": {"t0k": "alice"}}}"#,
    );
    cmd(dir.path())
        .args(["access", "/budgets"])
        .assert()
        .success()
        .stdout(pred::str::contains("authorized: dev (via dev auto-login)"));
    cmd(dir.path())
        .args(["access", "/api/accounts", "--api", "--token", "t0k"])
        .assert()
        .success()
        .stdout(pred::str::contains("authorized: alice (via api token)"));
    cmd(dir.path())
        .args(["access", "/api/accounts", "--api"])
        .assert()
        .success()
        .stdout(pred::str::contains("401 login required"));
}

#[test]
fn claim_fetch_sync_end_to_end() {
    let accounts_body = r#"{
        "errors": [],
        "accounts": [{
            "id": "ACT-1",
            "name": "Checking",
            "balance": "100.00",
            "currency": "USD",
            "org": {"name": "First Bank"},
            "transactions": [
                {"id": "T1", "posted": 1736906400, "amount": "-15.49", "description": "NETFLIX.COM", "payee": "Netflix"},
                {"id": "T2", "posted": 1736906400, "description": "missing amount"}
            ]
        }]
    }"#
    .to_string();
    let accounts_server = serve(vec![(200, accounts_body.clone()), (200, accounts_body)]);
    let accounts_host = accounts_server.base.trim_start_matches("http://").to_string();
    let claim_server = serve(vec![(200, format!("http://u:p@{accounts_host}/simplefin"))]);
    let token = base64::engine::general_purpose::STANDARD
        .encode(format!("{}/claim/once", claim_server.base));

    let dir = tempfile::tempdir().unwrap();
    init(&dir);
    cmd(dir.path())
        .args(["rules", "add", "netflix", "--category", "Subscriptions"])
        .assert()
        .success();

    cmd(dir.path())
        .args(["simplefin", "claim", &token])
        .assert()
        .success()
        .stdout(pred::str::contains(format!(
            "Connected to SimpleFin at http://{accounts_host}/simplefin"
        )));
    let claim_requests = claim_server.finish();
    assert_eq!(claim_requests[0].method, "POST");
    assert_eq!(claim_requests[0].target, "/claim/once");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(dir.path().join("settings.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let output = dir.path().join("fetch.json");
    cmd(dir.path())
        .args(["simplefin", "fetch", "--days", "10", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(pred::str::contains("Checking"))
        .stdout(pred::str::contains("First Bank"))
        .stdout(pred::str::contains("skipped Checking / T2: missing amount"));
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["accounts"][0]["balance"], serde_json::json!(100.0));
    assert_eq!(written["accounts"][0]["transactions"][0]["transaction_type"], "expense");
    assert_eq!(written["warnings"].as_array().unwrap().len(), 1);

    cmd(dir.path())
        .args(["simplefin", "sync", "--days", "10"])
        .assert()
        .success()
        .stdout(pred::str::contains("1 accounts created"))
        .stdout(pred::str::contains("1 imported"))
        .stdout(pred::str::contains("1 categorized, 0 still flagged"));
    let account_requests = accounts_server.finish();
    assert_eq!(account_requests.len(), 2);
    for request in &account_requests {
        assert_eq!(request.method, "GET");
        assert!(request.target.starts_with("/simplefin/accounts?start-date="));
        // base64("u:p")
        assert_eq!(request.authorization.as_deref(), Some("Basic dTpw"));
    }

    cmd(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(pred::str::contains("Accounts:      1"))
        .stdout(pred::str::contains("Transactions:  1"))
        .stdout(pred::str::contains(format!("SimpleFin:  http://{accounts_host}/simplefin")));
}
