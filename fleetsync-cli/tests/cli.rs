//! Binary-level tests: argument handling, configuration errors, and the
//! non-interactive commands against wiremock-backed services.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A `fleetsync` command with an empty environment rooted in `home`, so the
/// developer's `.env` and config file never leak in.
fn fleetsync(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fleetsync").expect("fleetsync binary");
    cmd.env_clear()
        .env("HOME", home)
        .env("USERPROFILE", home)
        .current_dir(home);
    cmd
}

async fn run(cmd: Command) -> assert_cmd::assert::Assert {
    let mut cmd = cmd;
    tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .expect("command task panicked")
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    fleetsync(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sites"))
        .stdout(predicate::str::contains("domains"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn missing_dashboard_url_names_the_key() {
    let home = TempDir::new().unwrap();
    fleetsync(home.path())
        .args(["sites", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MAINWP_DASHBOARD_URL"));
}

#[test]
fn missing_env_file_is_an_error() {
    let home = TempDir::new().unwrap();
    fleetsync(home.path())
        .args(["--env-file", "does-not-exist.env", "domains"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load env file"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let home = TempDir::new().unwrap();
    fleetsync(home.path())
        .env("MAINWP_DASHBOARD_URL", "http://127.0.0.1:9")
        .args(["--config", "typo.yaml", "sites", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"))
        .stderr(predicate::str::contains("typo.yaml"))
        .stderr(predicate::str::contains("MAINWP_DASHBOARD_URL").not());
}

#[test]
fn zero_poll_interval_is_rejected() {
    let home = TempDir::new().unwrap();
    fleetsync(home.path())
        .env("FLEETSYNC_POLL_INTERVAL_SECS", "0")
        .args(["sites", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FLEETSYNC_POLL_INTERVAL_SECS"));
}

#[test]
fn malformed_config_file_is_reported() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("fleetsync.yaml");
    std::fs::write(&config, "mainwp: [not, a, map]\n").unwrap();
    fleetsync(home.path())
        .arg("--config")
        .arg(&config)
        .args(["sites", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config"));
}

#[tokio::test(flavor = "multi_thread")]
async fn sites_list_json_reads_the_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/mainwp/v1/sites/get-sites-by-url"))
        .and(query_param("with_tags", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "12": { "name": "Beta", "url": "https://beta.example/", "securityIssues": 0, "health_value": 95 },
            "3": { "name": "Acme", "url": "https://acme.example/", "securityIssues": "6", "health_value": "40",
                   "http_response_code": "500" }
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = fleetsync(home.path());
    cmd.env("MAINWP_DASHBOARD_URL", server.uri())
        .env("WP_MANAGE_CONSUMER_KEY", "ck")
        .env("WP_MANAGE_SECRET_KEY", "cs")
        .args(["--no-color", "sites", "list", "--json"]);

    let assert = run(cmd).await.success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let sites: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(sites[0]["id"], "3");
    assert_eq!(sites[0]["security_issues"], 6);
    assert_eq!(sites[0]["last_check_status"], "500 - Error");
    assert_eq!(sites[1]["name"], "Beta");
}

#[tokio::test(flavor = "multi_thread")]
async fn domains_report_marks_unmanaged_domains() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/virtual-server/remote.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [
                { "name": "Domain        Username" },
                { "name": "------------- --------" },
                { "name": "acme.example  acme" },
                { "name": "parked.example  parked" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/mainwp/v1/sites/get-sites-by-url"))
        .and(query_param("urls", "acme.example"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "3": { "name": "Acme", "url": "https://acme.example/", "securityIssues": 0, "health_value": 90 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/mainwp/v1/sites/get-sites-by-url"))
        .and(query_param("urls", "parked.example"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = fleetsync(home.path());
    cmd.env("MAINWP_DASHBOARD_URL", server.uri())
        .env("WP_MANAGE_CONSUMER_KEY", "ck")
        .env("WP_MANAGE_SECRET_KEY", "cs")
        .env("VIRTUALMIN_URL", format!("{}/virtual-server/remote.cgi", server.uri()))
        .env("LIVE_SERVER_USERNAME", "root")
        .env("LIVE_SERVER_PASSWORD", "pw")
        .args(["--no-color", "domains"]);

    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("2 domains found on server."))
        .stdout(predicate::str::contains("Name: Acme"))
        .stdout(predicate::str::contains("parked.example - Not found on WPmanage"));
}

#[tokio::test(flavor = "multi_thread")]
async fn repo_sync_dry_run_reads_env_file_and_writes_nothing() {
    let server = MockServer::start().await;
    let db = "0123456789abcdef0123456789abcdef";
    let dashed = "01234567-89ab-cdef-0123-456789abcdef";
    Mock::given(method("GET"))
        .and(path(format!("/notion/databases/{dashed}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": { "Name": {}, "URL": {}, "Last Commit": {}, "Developer": {}, "Comment": {} }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/notion/databases/{dashed}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/notion/pages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gitlab/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 5, "name": "billing-api", "web_url": "https://gitlab.example/acme/billing-api" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gitlab/projects/5/repository/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let env_file = home.path().join("staging.env");
    std::fs::write(
        &env_file,
        format!(
            "NOTION_API_KEY=secret\nNOTION_DATABASE_GIT_ID={db}\nNOTION_API_URL={uri}/notion\n\
             GITLAB_TOKEN=glpat\nGITLAB_API_URL={uri}/gitlab\n",
            uri = server.uri()
        ),
    )
    .unwrap();

    let mut cmd = fleetsync(home.path());
    cmd.arg("--env-file")
        .arg(&env_file)
        .args(["--no-color", "sync", "repos", "--dry-run"]);

    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("[dry-run]"))
        .stdout(predicate::str::contains("billing-api (would create)"))
        .stdout(predicate::str::contains("1 created"));
}

const MAINWP_PREFIX: &str = "/wp-json/mainwp/v1";

fn mainwp_env(cmd: &mut Command, server: &MockServer) {
    cmd.env("MAINWP_DASHBOARD_URL", server.uri())
        .env("WP_MANAGE_CONSUMER_KEY", "ck")
        .env("WP_MANAGE_SECRET_KEY", "cs");
}

async fn mount_trigger(server: &MockServer, endpoint: &str, status: u16) {
    Mock::given(method("PUT"))
        .and(path(format!("{MAINWP_PREFIX}/site/{endpoint}")))
        .and(query_param("site_id", "5"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "success": status == 200 })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn sites_update_with_yes_triggers_and_waits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{MAINWP_PREFIX}/site/site")))
        .and(query_param("site_id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Acme",
            "url": "https://acme.example/",
            "wp_version": "6.4",
            "wp_core_update": "6.5",
            "plugin_upgrades": "{\"akismet\":{\"update\":{\"new_version\":\"5.3\"}}}"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{MAINWP_PREFIX}/site/site")))
        .and(query_param("site_id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Acme",
            "url": "https://acme.example/",
            "wp_core_update": false,
            "plugin_upgrades": "[]",
            "site_info": "{\"wpversion\":\"6.5\"}"
        })))
        .mount(&server)
        .await;
    mount_trigger(&server, "site-update-wordpress", 200).await;
    mount_trigger(&server, "site-update-plugins", 200).await;

    let home = TempDir::new().unwrap();
    let mut cmd = fleetsync(home.path());
    mainwp_env(&mut cmd, &server);
    cmd.env("FLEETSYNC_POLL_INTERVAL_SECS", "1")
        .args(["--no-color", "sites", "update", "5", "--yes", "--wait"]);

    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Acme (https://acme.example/) - WordPress 6.4 - 1 plugin update(s) pending"))
        .stdout(predicate::str::contains("WordPress core update response"))
        .stdout(predicate::str::contains("Plugin update response"))
        .stdout(predicate::str::contains("wordpress update applied"))
        .stdout(predicate::str::contains("plugins update applied"))
        .stdout(predicate::str::contains("Current WordPress version: 6.5"));
}

#[tokio::test(flavor = "multi_thread")]
async fn sites_update_fails_when_no_trigger_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{MAINWP_PREFIX}/site/site")))
        .and(query_param("site_id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Acme",
            "url": "https://acme.example/",
            "plugin_upgrades": { "akismet": {} }
        })))
        .mount(&server)
        .await;
    mount_trigger(&server, "site-update-wordpress", 500).await;
    mount_trigger(&server, "site-update-plugins", 500).await;

    let home = TempDir::new().unwrap();
    let mut cmd = fleetsync(home.path());
    mainwp_env(&mut cmd, &server);
    cmd.args(["--no-color", "sites", "update", "5", "--yes"]);

    run(cmd)
        .await
        .failure()
        .stdout(predicate::str::contains("WordPress core update failed"))
        .stdout(predicate::str::contains("Plugin update failed"))
        .stderr(predicate::str::contains("no update could be triggered for site 5"));
}

#[tokio::test(flavor = "multi_thread")]
async fn domain_sync_with_failed_rows_exits_non_zero() {
    let server = MockServer::start().await;
    let dashed = "fedcba98-7654-3210-fedc-ba9876543210";
    Mock::given(method("GET"))
        .and(path("/virtual-server/remote.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [
                { "name": "acme.example  acme" },
                { "name": "beta.example  beta" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{MAINWP_PREFIX}/sites/get-sites-by-url")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("/notion/databases/{dashed}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "properties": {} })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/notion/databases/{dashed}/query")))
        .and(body_partial_json(json!({ "filter": { "title": { "equals": "acme.example" } } })))
        .respond_with(ResponseTemplate::new(503).set_body_string("notion is down"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/notion/databases/{dashed}/query")))
        .and(body_partial_json(json!({ "filter": { "title": { "equals": "beta.example" } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/notion/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "page-beta" })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = fleetsync(home.path());
    mainwp_env(&mut cmd, &server);
    cmd.env("VIRTUALMIN_URL", format!("{}/virtual-server/remote.cgi", server.uri()))
        .env("LIVE_SERVER_USERNAME", "root")
        .env("LIVE_SERVER_PASSWORD", "pw")
        .env("NOTION_API_KEY", "secret")
        .env("NOTION_DATABASE_ID", "fedcba9876543210fedcba9876543210")
        .env("NOTION_API_URL", format!("{}/notion", server.uri()))
        .args(["--no-color", "sync", "domains"]);

    run(cmd)
        .await
        .failure()
        .stdout(predicate::str::contains("+  beta.example"))
        .stdout(predicate::str::contains("acme.example: "))
        .stdout(predicate::str::contains("domains sync: 1 created, 0 updated, 0 skipped, 1 failed"))
        .stderr(predicate::str::contains("domains sync finished with failures"));
}
