use std::collections::HashMap;
use std::path::PathBuf;

use medcert_api::config::ServiceConfig;
use medcert_export::pdf::SourceKind;
use medcert_storage::Store;

#[test]
fn defaults_use_a_database_under_data_dir() {
    let config = ServiceConfig::default();
    assert_eq!(config.bind, "0.0.0.0:5000");
    assert_eq!(config.database_path(), Some(PathBuf::from("data/medcert.db")));
    assert_eq!(config.backup_dir(), PathBuf::from("data/backups"));
    assert_eq!(config.export.output_dir, PathBuf::from("data/generated_documents"));
}

#[test]
fn pre_versioned_config_is_migrated() {
    let config = ServiceConfig::from_json(
        r#"{
            "bind": "127.0.0.1:8080",
            "template": "/srv/templates/declaracao.docx",
            "output_dir": "/srv/out",
            "export": { "pdf_source": "docx" }
        }"#,
    )
    .unwrap();

    assert_eq!(config.config_version, 1);
    assert_eq!(config.bind, "127.0.0.1:8080");
    assert_eq!(
        config.export.template,
        Some(PathBuf::from("/srv/templates/declaracao.docx"))
    );
    assert_eq!(config.export.output_dir, PathBuf::from("/srv/out"));
    assert_eq!(config.export.pdf_source, SourceKind::Docx);
}

#[test]
fn current_config_is_read_as_is() {
    let config = ServiceConfig::from_json(
        r#"{ "config_version": 1, "database": ":memory:", "export": { "timeout_secs": 5 } }"#,
    )
    .unwrap();
    assert_eq!(config.database_path(), None);
    assert_eq!(config.export.timeout_secs, 5);
}

#[test]
fn newer_config_is_refused() {
    let err = ServiceConfig::from_json(r#"{ "config_version": 99 }"#).unwrap_err();
    assert!(err.to_string().contains("newer than this build"));

    assert!(ServiceConfig::from_json("[1, 2]").is_err());
}

#[test]
fn environment_overrides_file_values() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("MEDCERT_BIND", "127.0.0.1:9000"),
        ("MEDCERT_DATA_DIR", "/var/lib/medcert"),
        ("MEDCERT_LOGO", "/etc/medcert/logo.png"),
        ("MEDCERT_DB", "records.db"),
        ("FRONTEND_URL", "https://medcert.example.com"),
        ("MEDCERT_TEMPLATE", "   "),
    ]);

    let mut config = ServiceConfig::default();
    config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

    assert_eq!(config.bind, "127.0.0.1:9000");
    assert_eq!(
        config.database_path(),
        Some(PathBuf::from("/var/lib/medcert/records.db"))
    );
    assert_eq!(config.backup_dir(), PathBuf::from("/var/lib/medcert/backups"));
    assert_eq!(
        config.export.output_dir,
        PathBuf::from("/var/lib/medcert/generated_documents")
    );
    assert_eq!(config.export.logo, Some(PathBuf::from("/etc/medcert/logo.png")));
    assert_eq!(config.frontend_url.as_deref(), Some("https://medcert.example.com"));
    // Blank values are ignored.
    assert_eq!(config.export.template, None);
}

#[test]
fn state_builds_on_a_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::default();
    config.apply_overrides(|name| {
        (name == "MEDCERT_DATA_DIR").then(|| dir.path().display().to_string())
    });

    let state = medcert_api::build_state(&config).unwrap();
    assert!(dir.path().join("medcert.db").exists());
    assert_eq!(state.store.stats().unwrap().patients, 0);
    assert_eq!(state.backup_dir, dir.path().join("backups"));
}
