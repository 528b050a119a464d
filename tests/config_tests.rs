//! Configuration loaded from disk driving a full conversation.

use parley::{ConfigError, ParleyConfig, StopReason, TerminationReason};
use parley_testing::fixtures;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[tokio::test]
async fn file_config_sets_safeguard_and_agent_overrides() {
    let file = write_config(
        r#"
[model]
id = "offline-rules"
provider = "offline"

[runner]
app_id = "poetry_app"
max_turns_safeguard = 3
tool_timeout = "5s"

[agents.critic]
description = "Never satisfied."
"#,
    );
    let config = ParleyConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.runner.tool_timeout, Duration::from_secs(5));

    let mut runner = fixtures::critic_runner(config, 100).build().unwrap();
    assert_eq!(runner.session_key().app_id.as_str(), "poetry_app");
    let critic = runner
        .team()
        .get(&fixtures::agent_id(fixtures::CRITIC_AGENT))
        .unwrap();
    assert_eq!(critic.description(), "Never satisfied.");

    let outcome = runner.run_to_completion(fixtures::POEM_TASK).await.unwrap();
    assert_eq!(outcome.messages.len(), 4);
    assert_eq!(
        outcome.stop_reason,
        StopReason::Terminated(TerminationReason::SafeguardReached { turns: 3 })
    );
}

#[test]
fn missing_model_fails_before_any_turn() {
    let file = write_config("[runner]\nmax_tool_rounds = 4\n");
    let config = ParleyConfig::load_from_file(file.path()).unwrap();

    let err = fixtures::weather_runner(config).build().unwrap_err();
    assert_eq!(err, ConfigError::MissingModel);
}

#[test]
fn unknown_keys_are_rejected() {
    let file = write_config("[model]\nid = \"m\"\ntemperature = 0.2\n");
    let err = ParleyConfig::load_from_file(file.path()).unwrap_err();
    assert_eq!(err.error_code(), "CONFIG_PARSE");
}

#[test]
fn unreadable_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ParleyConfig::load_from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
