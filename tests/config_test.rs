//! Integration tests for Settings config loading with layered precedence.
//!
//! These tests only write local configs into temp directories; a global
//! config of the machine running them would sit below those layers.

use std::collections::HashMap;
use std::fs;

use tempfile::TempDir;

use talent_solver::application::ApplicationError;
use talent_solver::config::{env_source, local_config_path, Settings};
use talent_solver::domain::UnlockRule;

fn env(vars: &[(&str, &str)]) -> config::Environment {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env_source().source(Some(map))
}

#[test]
fn given_local_config_when_load_then_overrides_values() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        r#"
[solver]
unlock_rule = "maxed"
threads = 2

[output]
page_size = 50
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.solver.unlock_rule, UnlockRule::Maxed);
    assert_eq!(settings.solver.threads, 2);
    assert_eq!(settings.output.page_size, 50);
}

#[test]
fn given_empty_directory_when_load_then_keeps_compiled_limits() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert!(settings.solver.max_configurations > 0);
    assert!(settings.output.page_size > 0);
}

#[test]
fn given_malformed_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "[solver]\nunlock_rule = \"sometimes\"\n",
    )
    .unwrap();

    let err = Settings::load(Some(dir.path())).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_env_vars_when_applied_then_override_file_values() {
    let base = Settings::default();

    let settings = base
        .apply_env(env(&[
            ("TSOLVE_SOLVER__UNLOCK_RULE", "maxed"),
            ("TSOLVE_SOLVER__THREADS", "8"),
            ("TSOLVE_OUTPUT__PAGE_SIZE", "5"),
            ("OTHER_SOLVER__THREADS", "1"),
        ]))
        .unwrap();

    assert_eq!(settings.solver.unlock_rule, UnlockRule::Maxed);
    assert_eq!(settings.solver.threads, 8);
    assert_eq!(settings.output.page_size, 5);
}

#[test]
fn given_invalid_env_value_when_applied_then_config_error() {
    let err = Settings::default()
        .apply_env(env(&[("TSOLVE_SOLVER__UNLOCK_RULE", "never")]))
        .unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_no_env_vars_when_applied_then_settings_unchanged() {
    let settings = Settings::default().apply_env(env(&[])).unwrap();
    assert_eq!(settings, Settings::default());
}
