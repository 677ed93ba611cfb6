//! Config file to running settings.

use std::io::Write;

use kiln_config::KilnConfig;
use kiln_engine::{AppSettings, ProjectId};
use pretty_assertions::assert_eq;

#[test]
fn config_file_drives_endpoints_and_preview() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [server]
        http_url = "https://builder.example.com/api"
        ws_url = "wss://builder.example.com/api"

        [preview]
        url_template = "https://{{sandbox_id}}.preview.example.com"
        "#
    )
    .unwrap();

    let config = KilnConfig::load_from(file.path()).unwrap();
    let settings = AppSettings::from_config(&config).unwrap();
    let project = ProjectId::new("demo").unwrap();

    assert_eq!(
        settings.endpoints().manifest(&project).unwrap().as_str(),
        "https://builder.example.com/api/chat/demo"
    );
    assert_eq!(
        settings.endpoints().stream(&project).unwrap().as_str(),
        "wss://builder.example.com/api/ws/demo"
    );
    assert_eq!(
        settings.preview().render("sbx9"),
        "https://sbx9.preview.example.com"
    );
}

#[test]
fn template_without_placeholder_is_rejected() {
    let mut config = KilnConfig::default();
    config.preview.url_template = "https://preview.example.com".into();
    assert!(AppSettings::from_config(&config).is_err());
}

#[test]
fn mismatched_scheme_is_rejected() {
    let mut config = KilnConfig::default();
    config.server.ws_url = "http://localhost:8000".into();
    assert!(AppSettings::from_config(&config).is_err());
}
