//! Unit tests for CLI commands.

use super::*;

use camino::Utf8Path;
use clap::Parser;
use sprig_core::utils::sha1_hex;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::Cli;

/// Create a temporary directory for testing
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

fn utf8(path: &std::path::Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()
}

fn test_settings(registry: &str, cache_dir: &Utf8Path) -> Settings {
    let mut settings = Settings::default();
    settings.registry.url = registry.to_string();
    settings.registry.retry.max_retries = 0;
    settings.download.show_progress = false;
    settings.cache.dir = Some(cache_dir.to_string());
    settings
}

/// Project directory and cache directory side by side in one temp dir
fn create_test_context(temp_dir: &TempDir, registry: &str) -> CommandContext {
    let root = utf8(temp_dir.path());
    let project = root.join("project");
    std::fs::create_dir_all(&project).unwrap();
    CommandContext::with_settings(project, test_settings(registry, &root.join("cache")))
}

async fn publish(server: &MockServer, name: &str, version: &str, content: &[u8]) {
    let document = serde_json::json!({
        "name": name,
        "description": format!("The {} package", name),
        "dist-tags": { "latest": version },
        "versions": {
            version: {
                "version": version,
                "dist": {
                    "tarball": format!("{}/{}/-/{}-{}.tgz", server.uri(), name, name, version),
                    "shasum": sha1_hex(content)
                }
            }
        }
    });

    Mock::given(method("GET"))
        .and(path(format!("/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/{}/-/{}-{}.tgz", name, name, version)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

#[test]
fn test_parse_package_spec() {
    assert_eq!(
        parse_package_spec("express"),
        ("express".to_string(), "latest".to_string())
    );
    assert_eq!(
        parse_package_spec("express@^4.17.0"),
        ("express".to_string(), "^4.17.0".to_string())
    );
    assert_eq!(
        parse_package_spec("@types/node"),
        ("@types/node".to_string(), "latest".to_string())
    );
    assert_eq!(
        parse_package_spec("@types/node@>=18 <21"),
        ("@types/node".to_string(), ">=18 <21".to_string())
    );
    assert_eq!(
        parse_package_spec("lodash@"),
        ("lodash".to_string(), "latest".to_string())
    );
}

#[test]
fn test_settings_conversion() {
    let mut settings = Settings::default();
    settings.registry.url = "http://localhost:4873".to_string();
    settings.registry.token = Some("abc".to_string());
    settings.registry.retry.retry_delay_ms = 250;
    settings.download.concurrency = 0;
    settings.download.timeout_secs = Some(90);

    let config = registry_config(&settings);
    assert_eq!(config.base_url, "http://localhost:4873");
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.token.as_deref(), Some("abc"));
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.retry_delay, Duration::from_millis(250));
    assert_eq!(config.retry.max_wait, Duration::from_secs(60));

    let options = download_options(&settings);
    assert_eq!(options.concurrency, 3);
    assert!(options.use_cache);
    assert_eq!(options.timeout, Some(Duration::from_secs(90)));
}

#[test]
fn test_cli_flags_become_overrides() {
    let cli = Cli::try_parse_from([
        "sprig",
        "--registry",
        "http://localhost:4873",
        "download",
        "express@^4",
        "--no-cache",
        "--no-progress",
        "-j",
        "8",
    ])
    .unwrap();

    let overrides = cli.overrides();
    assert_eq!(overrides.registry.as_deref(), Some("http://localhost:4873"));
    assert_eq!(overrides.concurrency, Some(8));
    assert!(overrides.no_cache);
    assert!(overrides.no_progress);

    let cli = Cli::try_parse_from(["sprig", "install", "--production", "--cache-dir", "/tmp/c"]).unwrap();
    let overrides = cli.overrides();
    assert_eq!(overrides.cache_dir, Some(Utf8PathBuf::from("/tmp/c")));
    assert!(!overrides.no_cache);
    assert!(matches!(cli.command, Commands::Install { production: true, .. }));
}

#[tokio::test]
async fn test_init_creates_package_json() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, "http://unused.invalid");

    init::execute(false, &ctx).await.unwrap();

    let manifest = sprig_config::json::load_from_file(&ctx.cwd.join("package.json"))
        .await
        .unwrap();
    assert_eq!(manifest.name, "project");
    assert_eq!(manifest.version, "1.0.0");
    assert!(manifest.validate().is_empty());
}

#[tokio::test]
async fn test_init_keeps_existing_without_force() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, "http://unused.invalid");
    let path = ctx.cwd.join("package.json");
    std::fs::write(&path, "{\"name\": \"mine\"}").unwrap();

    init::execute(false, &ctx).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"name\": \"mine\"}");

    init::execute(true, &ctx).await.unwrap();
    assert!(std::fs::read_to_string(&path).unwrap().contains("\"name\": \"project\""));
}

#[tokio::test]
async fn test_install_without_manifest_fails() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, "http://unused.invalid");

    let err = install::install(false, &ctx).await.unwrap_err();
    assert_eq!(err.kind(), "config_error");
}

#[tokio::test]
async fn test_install_rejects_invalid_manifest() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, "http://unused.invalid");
    std::fs::write(
        ctx.cwd.join("package.json"),
        r#"{ "name": "Bad Name", "version": "1.0", "dependencies": { "x": "not a version" } }"#,
    )
    .unwrap();

    let err = install::install(false, &ctx).await.unwrap_err();
    assert_eq!(err.kind(), "config_error");
    assert!(err.to_string().contains("3 problems"), "{}", err);
}

#[tokio::test]
async fn test_install_downloads_manifest_dependencies() {
    let server = MockServer::start().await;
    publish(&server, "left-pad", "1.3.0", b"left-pad archive").await;
    publish(&server, "typescript", "5.4.2", b"typescript archive").await;

    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, &server.uri());
    std::fs::write(
        ctx.cwd.join("package.json"),
        r#"{
            "name": "demo",
            "version": "1.0.0",
            "dependencies": { "left-pad": "^1.3.0" },
            "devDependencies": { "typescript": "^5.0.0" }
        }"#,
    )
    .unwrap();

    let production = install::install(true, &ctx).await.unwrap();
    assert_eq!(production.len(), 1);
    assert_eq!(production[0].name, "left-pad");

    let mut all = install::install(false, &ctx).await.unwrap();
    all.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(all.len(), 2);
    assert!(all[0].cached);
    assert!(!all[1].cached);
    assert_eq!(all[0].size, b"left-pad archive".len() as u64);
    assert_eq!(all[1].size, b"typescript archive".len() as u64);
    assert_eq!(std::fs::read(&all[1].path).unwrap(), b"typescript archive");
}

#[tokio::test]
async fn test_install_reports_partial_failure() {
    let server = MockServer::start().await;
    publish(&server, "left-pad", "1.3.0", b"left-pad archive").await;
    Mock::given(method("GET"))
        .and(path("/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, &server.uri());
    std::fs::write(
        ctx.cwd.join("package.json"),
        r#"{ "name": "demo", "version": "1.0.0", "dependencies": { "left-pad": "1.3.0", "ghost": "^1.0.0" } }"#,
    )
    .unwrap();

    let err = install::install(false, &ctx).await.unwrap_err();
    match err {
        SprigError::PartialDependencyFailure {
            package,
            succeeded,
            failures,
        } => {
            assert_eq!(package, "demo@1.0.0");
            assert_eq!(succeeded, 1);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].name, "ghost");
        },
        other => panic!("expected partial failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_download_verify_and_clean() {
    let server = MockServer::start().await;
    publish(&server, "left-pad", "1.3.0", b"left-pad archive").await;

    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, &server.uri());

    assert_eq!(
        verify::verify("left-pad", &ctx).await.unwrap(),
        verify::Verification::NotCached
    );

    download::execute("left-pad@^1.0.0", false, &ctx).await.unwrap();
    assert_eq!(
        verify::verify("left-pad@1.3.0", &ctx).await.unwrap(),
        verify::Verification::Valid
    );

    let cached = ctx.cache().unwrap().entry_path("left-pad", "1.3.0").unwrap();
    std::fs::write(&cached, b"tampered").unwrap();
    let err = verify::verify("left-pad", &ctx).await.unwrap_err();
    assert_eq!(err.kind(), "cache_corrupted");
    assert!(!cached.exists());

    download::execute("left-pad", false, &ctx).await.unwrap();
    assert_eq!(ctx.cache().unwrap().stats().unwrap().entries, 1);

    clean::execute(&ctx).await.unwrap();
    assert_eq!(ctx.cache().unwrap().stats().unwrap().entries, 0);
}

#[tokio::test]
async fn test_info_command() {
    let server = MockServer::start().await;
    publish(&server, "left-pad", "1.3.0", b"left-pad archive").await;

    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, &server.uri());
    info::execute("left-pad", &ctx).await.unwrap();

    let err = info::execute("Not/A/Name", &ctx).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_package_name");
}

#[tokio::test]
async fn test_show_version() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, "http://unused.invalid");
    assert!(show_version(&ctx).await.is_ok());
}
