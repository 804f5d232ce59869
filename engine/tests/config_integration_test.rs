//! Configuration loading tests against real files

use std::fs;
use swarm_engine::config::{
    expand_path, Config, DisclosureSource, MemoryBackend, RoutingPolicyKind,
    MAX_PROCESSING_TIMEOUT_SECS,
};
use tempfile::TempDir;

fn with_data_dir(dir: &TempDir, body: &str) -> String {
    format!(
        "[core]\ndata_dir = \"{}\"\n\n{}",
        dir.path().join("data").display(),
        body
    )
}

#[test]
fn test_load_full_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let memory_path = dir.path().join("facts.db");

    let body = format!(
        r#"
[llm]
model = "gemini-1.5-pro"
request_timeout_secs = 30

[router]
policy = "keyword"
max_attempts = 5
backoff_secs = 1

[rewriter]
enabled = false
history_window = 6

[memory]
backend = "sqlite"
path = "{}"
disclosure_source = "rewritten"
triggers = ["my name is", "i prefer"]
short_circuit = false

[agents]
video_poll_interval_secs = 1
video_processing_timeout_secs = 60

[judge]
enabled = true
"#,
        memory_path.display()
    );
    fs::write(&path, with_data_dir(&dir, &body)).unwrap();

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.llm.model, "gemini-1.5-pro");
    assert_eq!(config.llm.request_timeout_secs, 30);
    assert_eq!(config.router.policy, RoutingPolicyKind::Keyword);
    assert_eq!(config.router.max_attempts, 5);
    assert!(!config.rewriter.enabled);
    assert_eq!(config.rewriter.history_window, 6);
    assert_eq!(config.memory.backend, MemoryBackend::Sqlite);
    assert_eq!(config.memory.path, memory_path);
    assert_eq!(config.memory.disclosure_source, DisclosureSource::Rewritten);
    assert_eq!(config.memory.triggers, vec!["my name is", "i prefer"]);
    assert!(!config.memory.short_circuit);
    assert_eq!(config.agents.processing_timeout().as_secs(), 60);
    assert!(config.judge.enabled);
    assert_eq!(config.judge.criteria, "accuracy, helpfulness, and safety");

    // data dir is created during validation
    assert!(dir.path().join("data").is_dir());
}

#[test]
fn test_sparse_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::from_toml_str(&with_data_dir(&dir, "")).unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.router.policy, RoutingPolicyKind::Classifier);
    assert_eq!(config.router.max_attempts, 3);
    assert!(config.rewriter.enabled);
    assert!(config.memory.short_circuit);
    assert_eq!(config.memory.disclosure_source, DisclosureSource::Original);
    assert_eq!(config.memory.triggers.len(), 4);
    assert!(!config.judge.enabled);
    assert_eq!(config.images_dir(), dir.path().join("data").join("images"));
}

#[test]
fn test_rejects_invalid_values() {
    let dir = TempDir::new().unwrap();

    let cases = [
        "[core]\nlog_level = \"loud\"\n",
        "[router]\nmax_attempts = 0\n",
        "[agents]\nsearch_max_attempts = 0\n",
        "[agents]\nvideo_processing_timeout_secs = 0\n",
        "[agents]\nvideo_processing_timeout_secs = 86401\n",
        "[agents]\nvideo_processing_timeout_secs = 9223372036854775807\n",
        "[agents]\nvideo_poll_interval_secs = 0\n",
        "[rewriter]\nhistory_window = 0\n",
        "[memory]\ntriggers = [\"my name is\", \"  \"]\n",
        "[llm]\nmodel = \"\"\n",
        "[router]\npolicy = \"dice\"\n",
    ];

    for body in cases {
        // the [core] override would clash with the first case's table
        let text = if body.starts_with("[core]") {
            body.to_string()
        } else {
            with_data_dir(&dir, body)
        };
        assert!(
            Config::from_toml_str(&text).is_err(),
            "expected rejection for {:?}",
            body
        );
    }
}

#[test]
fn test_processing_timeout_upper_bound_accepted() {
    let dir = TempDir::new().unwrap();
    let body = format!(
        "[agents]\nvideo_processing_timeout_secs = {}\n",
        MAX_PROCESSING_TIMEOUT_SECS
    );
    let config = Config::from_toml_str(&with_data_dir(&dir, &body)).unwrap();
    assert_eq!(
        config.agents.processing_timeout().as_secs(),
        MAX_PROCESSING_TIMEOUT_SECS
    );
}

#[test]
fn test_default_memory_path_follows_backend() {
    let dir = TempDir::new().unwrap();
    let home = dirs::home_dir().unwrap();

    let json = Config::from_toml_str(&with_data_dir(&dir, "")).unwrap();
    assert_eq!(json.memory.path, home.join(".swarm/user_memory.json"));

    let sqlite =
        Config::from_toml_str(&with_data_dir(&dir, "[memory]\nbackend = \"sqlite\"\n")).unwrap();
    assert_eq!(sqlite.memory.path, home.join(".swarm/user_memory.db"));

    // an explicit path is kept as written
    let custom = dir.path().join("facts.sqlite");
    let body = format!(
        "[memory]\nbackend = \"sqlite\"\npath = \"{}\"\n",
        custom.display()
    );
    let explicit = Config::from_toml_str(&with_data_dir(&dir, &body)).unwrap();
    assert_eq!(explicit.memory.path, custom);
}

#[test]
fn test_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    let result = Config::load_from_path(&dir.path().join("absent.toml"));
    assert!(result.is_err());
}

#[test]
fn test_expand_path() {
    let home = dirs::home_dir().unwrap();

    assert_eq!(
        expand_path(std::path::Path::new("~/.swarm/user_memory.json")).unwrap(),
        home.join(".swarm/user_memory.json")
    );
    assert_eq!(expand_path(std::path::Path::new("~")).unwrap(), home);
    assert_eq!(
        expand_path(std::path::Path::new("/tmp/facts.json")).unwrap(),
        std::path::PathBuf::from("/tmp/facts.json")
    );
}
