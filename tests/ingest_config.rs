// tests/ingest_config.rs
use news_signal_analyzer::config::PipelineConfig;
use news_signal_analyzer::ingest::config::{
    default_feeds, load_feeds_default, load_feeds_from, FeedKind,
};
use news_signal_analyzer::SourceTier;
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("feeds.toml");
    fs::write(
        &p_toml,
        r#"
[[feeds]]
name = "Reuters"
tier = "primary"
urls = [" https://a/rss ", ""]
"#,
    )
    .unwrap();
    let v = load_feeds_from(&p_toml).unwrap();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].urls, vec!["https://a/rss".to_string()]);
    assert_eq!(v[0].tier, SourceTier::Primary);

    let p_json = dir.path().join("feeds.json");
    fs::write(
        &p_json,
        r#"[{"name": "Wire", "tier": "secondary", "kind": "json", "urls": ["https://w"]}]"#,
    )
    .unwrap();
    let vj = load_feeds_from(&p_json).unwrap();
    assert_eq!(vj[0].kind, FeedKind::Json);
    assert_eq!(vj[0].tier, SourceTier::Secondary);
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var("INGEST_FEEDS_PATH");

    // 1) Nothing on disk -> built-in list
    assert_eq!(load_feeds_default().unwrap(), default_feeds());

    // 2) Fallback TOML in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("feeds.toml"),
        "[[feeds]]\nname = \"Only\"\ntier = \"primary\"\nurls = [\"https://only\"]\n",
    )
    .unwrap();
    let vt = load_feeds_default().unwrap();
    assert_eq!(vt.len(), 1);
    assert_eq!(vt[0].name, "Only");

    // 3) Env wins
    let p_env = tmp.path().join("feeds.json");
    fs::write(
        &p_env,
        r#"[{"name": "X", "tier": "secondary", "urls": ["https://x"]}]"#,
    )
    .unwrap();
    env::set_var("INGEST_FEEDS_PATH", p_env.display().to_string());
    let ve = load_feeds_default().unwrap();
    assert_eq!(ve[0].name, "X");

    // 4) Env pointing nowhere is an error
    env::set_var("INGEST_FEEDS_PATH", tmp.path().join("missing.toml"));
    assert!(load_feeds_default().is_err());
    env::remove_var("INGEST_FEEDS_PATH");

    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn pipeline_config_env_then_file_then_defaults() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var("PIPELINE_CONFIG_PATH");

    assert_eq!(PipelineConfig::load_default().unwrap(), PipelineConfig::default());

    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/pipeline.toml"),
        "[schedule]\ninterval_secs = 60\n",
    )
    .unwrap();
    assert_eq!(PipelineConfig::load_default().unwrap().schedule.interval_secs, 60);

    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "[pipeline]\nwindow_hours = 6\n").unwrap();
    env::set_var("PIPELINE_CONFIG_PATH", &p_env);
    let cfg = PipelineConfig::load_default().unwrap();
    assert_eq!(cfg.pipeline.window_hours, 6);
    assert_eq!(cfg.schedule.interval_secs, 3600);
    env::remove_var("PIPELINE_CONFIG_PATH");

    env::set_current_dir(&old).unwrap();
}
