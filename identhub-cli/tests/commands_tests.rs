use identhub_cli::cli::IdentityArgs;
use identhub_cli::commands;
use identhub_core::config::Config;
use serde_json::Value;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.identity.keystore_dir = Some(dir.path().join("keys"));
    config
}

fn alice() -> IdentityArgs {
    IdentityArgs { alias: Some("alice".to_string()), password: "correct horse".to_string() }
}

#[tokio::test]
async fn test_create_then_show() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let created: Value =
        serde_json::from_str(&commands::identity_create(&config, &alice()).await.unwrap()).unwrap();
    let shown: Value =
        serde_json::from_str(&commands::identity_show(&config, &alice()).unwrap()).unwrap();

    assert_eq!(created["signingPublic"], shown["signingPublic"]);
    assert_eq!(shown["alias"], "alice");
}

#[tokio::test]
async fn test_create_refuses_existing_alias() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    commands::identity_create(&config, &alice()).await.unwrap();
    assert!(commands::identity_create(&config, &alice()).await.is_err());
}

#[tokio::test]
async fn test_show_with_wrong_password_fails() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    commands::identity_create(&config, &alice()).await.unwrap();

    let wrong = IdentityArgs { password: "wrong".to_string(), ..alice() };
    assert!(commands::identity_show(&config, &wrong).is_err());
}

#[test]
fn test_commands_need_keystore() {
    assert!(commands::identity_show(&Config::default(), &alice()).is_err());
}

#[tokio::test]
async fn test_sign_and_verify() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let created: Value =
        serde_json::from_str(&commands::identity_create(&config, &alice()).await.unwrap()).unwrap();
    let public_key = created["signingPublic"].as_str().unwrap();

    let signature = commands::sign(&config, &alice(), "Hello World", false).unwrap();
    assert!(commands::verify("Hello World", &signature, public_key, false).unwrap());
    assert!(!commands::verify("Hello World!", &signature, public_key, false).unwrap());

    // "SGVsbG8gV29ybGQ=" is base64 for "Hello World"
    assert!(commands::verify("SGVsbG8gV29ybGQ=", &signature, public_key, true).unwrap());
    assert!(commands::verify("not base64!", &signature, public_key, true).is_err());
}

#[tokio::test]
async fn test_token_issue_and_verify() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    commands::identity_create(&config, &alice()).await.unwrap();

    let token = commands::token_issue(&config, &alice(), r#"{"username":"alice"}"#, None).unwrap();
    let (report, valid) = commands::token_verify(&token).unwrap();
    assert!(valid);
    let report: Value = serde_json::from_str(&report).unwrap();
    assert_eq!(report["claims"]["username"], "alice");

    let expired = commands::token_issue(&config, &alice(), "{}", Some(-1)).unwrap();
    let (report, valid) = commands::token_verify(&expired).unwrap();
    assert!(!valid);
    assert!(report.contains("TokenExpired"));

    assert!(commands::token_issue(&config, &alice(), "not json", None).is_err());
}

#[tokio::test]
async fn test_saml_metadata() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    commands::identity_create(&config, &alice()).await.unwrap();

    let xml = commands::saml_metadata(&config, &alice()).unwrap();
    assert!(xml.contains(&config.saml.entity_id));
    assert!(xml.contains("IDPSSODescriptor"));
}

#[test]
fn test_config_init() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("identhub.toml");
    let path = path.to_str().unwrap();

    commands::config_init(path, false).unwrap();
    let loaded = commands::load_config(Some(path)).unwrap();
    assert_eq!(loaded.identity.namespace, Config::default().identity.namespace);

    assert!(commands::config_init(path, false).is_err());
    assert!(commands::config_init(path, true).is_ok());
}
