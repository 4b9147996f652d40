use super::*;

use std::{collections::HashMap, fs};

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_target_sepolia_with_demo_stream_policy() {
    let settings = Settings::default();
    let policy = settings.stream_policy();
    assert_eq!(policy.chain_id, ChainId::SEPOLIA);
    assert_eq!(policy.initial_amount, Wei(1));
    assert_eq!(policy.amount_per_second, Wei(1));
    assert_eq!(policy.max_amount, Wei(10));
    assert_eq!(policy.validity_secs, 86_400);
    assert_eq!(policy.justification, "Payment for a subscription service");
    assert!(settings.validate().is_ok());
    assert!(settings.bundler_endpoint().expect("no bundler").is_none());
}

#[test]
fn reads_values_from_toml_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gator.toml");
    fs::write(
        &path,
        r#"
session = "bob"
wallet_url = "http://localhost:9000"
bundler_url = "https://bundler.example/rpc"
initial_amount_wei = 2
amount_per_second_wei = "0x3"
max_amount_wei = 500
justification = "Coffee"
"#,
    )
    .expect("write config");

    let settings = load_settings_from(Some(path.as_path()), no_env).expect("load");
    assert_eq!(settings.session, "bob");
    assert_eq!(settings.max_amount_wei, 500);
    assert_eq!(settings.initial_amount_wei, 2);
    assert_eq!(settings.amount_per_second_wei, 3);
    assert_eq!(settings.stream_policy().max_amount, Wei(500));
    assert_eq!(settings.justification, "Coffee");
    assert_eq!(
        settings
            .bundler_endpoint()
            .expect("valid")
            .map(|url| url.host_str().map(str::to_owned)),
        Some(Some("bundler.example".to_owned()))
    );
}

#[test]
fn environment_overrides_file_and_app_prefix_wins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gator.toml");
    fs::write(&path, "session = \"from-file\"\nchain_id = 1\n").expect("write config");

    let env = env_from(&[
        ("GATOR_SESSION", "from-gator"),
        ("APP__SESSION", "from-app"),
        ("GATOR_CHAIN_ID", "0xaa36a7"),
        ("GATOR_DATABASE_URL", "sqlite::memory:"),
    ]);
    let settings = load_settings_from(Some(path.as_path()), env).expect("load");
    assert_eq!(settings.session, "from-app");
    assert_eq!(settings.chain_id, ChainId::SEPOLIA.0);
    assert_eq!(settings.database_url, "sqlite::memory:");
}

#[test]
fn explicit_config_path_must_exist() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.toml");
    assert!(load_settings_from(Some(missing.as_path()), no_env).is_err());
}

#[test]
fn unknown_keys_in_file_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gator.toml");
    fs::write(&path, "wallet = \"http://localhost\"\n").expect("write config");

    let err = load_settings_from(Some(path.as_path()), no_env).expect_err("unknown key");
    assert!(format!("{err:#}").contains("failed to parse config file"));
}

#[test]
fn validation_rejects_bad_endpoints_and_amounts() {
    let settings = Settings {
        wallet_url: "not a url".into(),
        ..Settings::default()
    };
    assert!(format!("{:#}", settings.validate().expect_err("bad url")).contains("wallet_url"));

    let settings = Settings {
        bundler_url: Some("ftp://bundler.example".into()),
        ..Settings::default()
    };
    assert!(settings.validate().is_err());

    let settings = Settings {
        initial_amount_wei: 20,
        max_amount_wei: 10,
        ..Settings::default()
    };
    assert!(settings.validate().is_err());

    let settings = Settings {
        session: "  ".into(),
        ..Settings::default()
    };
    assert!(settings.validate().is_err());
}

#[test]
fn invalid_numeric_override_is_reported() {
    let env = env_from(&[("GATOR_VALIDITY_SECS", "tomorrow")]);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gator.toml");
    fs::write(&path, "").expect("write config");
    let err = load_settings_from(Some(path.as_path()), env).expect_err("bad override");
    assert!(err.to_string().contains("invalid validity override"));
}

#[test]
fn stream_policy_amounts_can_come_from_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gator.toml");
    fs::write(&path, "max_amount_wei = 50\njustification = \"From file\"\n").expect("write config");

    let env = env_from(&[
        ("GATOR_INITIAL_AMOUNT_WEI", "5"),
        ("GATOR_AMOUNT_PER_SECOND_WEI", "0x2"),
        ("APP__MAX_AMOUNT_WEI", "1000"),
        ("GATOR_JUSTIFICATION", "Streaming rent"),
    ]);
    let settings = load_settings_from(Some(path.as_path()), env).expect("load");
    let policy = settings.stream_policy();
    assert_eq!(policy.initial_amount, Wei(5));
    assert_eq!(policy.amount_per_second, Wei(2));
    assert_eq!(policy.max_amount, Wei(1000));
    assert_eq!(policy.justification, "Streaming rent");

    let err = load_settings_from(
        Some(path.as_path()),
        env_from(&[("GATOR_MAX_AMOUNT_WEI", "lots")]),
    )
    .expect_err("bad amount");
    assert!(err.to_string().contains("invalid max amount override"));
}
