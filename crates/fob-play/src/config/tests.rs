#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use crate::config::*;
    use crate::error::{ConfigError, PlayError};
    use clap::Parser;
    use serial_test::serial;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["fob-play"];
        argv.extend_from_slice(args);
        argv.push("test/*.js");
        Cli::try_parse_from(argv).unwrap()
    }

    fn write_config(dir: &TempDir, json: &str) {
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), json).unwrap();
    }

    #[test]
    fn test_serialization() {
        let config = PlayConfig {
            bundler: BundlerKind::Transpile,
            reporter: Some("dot".to_string()),
            browser: BrowserSettings {
                chrome_path: Some(PathBuf::from("/usr/bin/chromium")),
                args: vec!["--lang=en".to_string()],
                window_size: Some((800, 600)),
            },
            ..PlayConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PlayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);

        // camelCase field names
        let json_val = serde_json::to_value(&config).unwrap();
        assert!(json_val["browser"].get("chromePath").is_some());
        assert!(json_val["browser"].get("chrome_path").is_none());

        // skip_serializing_if
        let minimal = serde_json::to_value(PlayConfig::default()).unwrap();
        assert!(minimal.get("bundlerConfig").is_none());
        assert!(minimal.get("grep").is_none());

        assert_eq!(
            serde_json::to_string(&BundlerKind::Rolldown).unwrap(),
            "\"rolldown\""
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = serde_json::from_str::<PlayConfig>(r#"{ "prot": 3000 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        assert!(PlayConfig::default().validate().is_ok());

        for config in [
            PlayConfig {
                iterate: 0,
                ..PlayConfig::default()
            },
            PlayConfig {
                timeout: 0,
                ..PlayConfig::default()
            },
            PlayConfig {
                port: 0,
                ..PlayConfig::default()
            },
            PlayConfig {
                browser: BrowserSettings {
                    window_size: Some((0, 600)),
                    ..BrowserSettings::default()
                },
                ..PlayConfig::default()
            },
        ] {
            let err = config.validate().unwrap_err();
            assert!(matches!(
                err,
                PlayError::Config(ConfigError::InvalidValue { .. })
            ));
        }
    }

    #[test]
    fn test_run_configuration_defaults() {
        let run = PlayConfig::default()
            .into_run_configuration(vec![PathBuf::from("/t/a.js")], PathBuf::from("/t"), false)
            .unwrap();

        assert_eq!(run.preferred_port, 3000);
        assert!(!run.keep_open);
        assert!(run.launch.headless || cfg!(feature = "visible"));
        assert_eq!(run.context.viewport, Some((1280, 720)));
        assert_eq!(run.harness.reporter, "spec");
        assert_eq!(run.harness.ui, "bdd");
        assert_eq!(run.harness.timeout_ms, 2000);
        assert!(matches!(run.bundler, BundlerSelection::Rolldown(_)));
    }

    #[test]
    fn test_watch_mode_shows_browser() {
        let run = PlayConfig::default()
            .into_run_configuration(vec![PathBuf::from("/t/a.js")], PathBuf::from("/t"), true)
            .unwrap();

        assert!(run.keep_open);
        assert!(!run.launch.headless);
        assert!(run.launch.devtools);
        assert_eq!(run.context.viewport, None);
        assert_eq!(run.harness.reporter, "html");
    }

    #[test]
    fn test_explicit_reporter_wins_in_watch_mode() {
        let config = PlayConfig {
            reporter: Some("dot".to_string()),
            ..PlayConfig::default()
        };
        let run = config
            .into_run_configuration(vec![PathBuf::from("/t/a.js")], PathBuf::from("/t"), true)
            .unwrap();
        assert_eq!(run.harness.reporter, "dot");
    }

    #[test]
    fn test_empty_file_list_is_rejected() {
        let err = PlayConfig::default()
            .into_run_configuration(vec![], PathBuf::from("/t"), false)
            .unwrap_err();
        assert!(matches!(err, PlayError::NoTestFiles));
    }

    #[test]
    fn test_bundler_config_is_checked_against_bundler() {
        let config = PlayConfig {
            bundler: BundlerKind::Transpile,
            bundler_config: serde_json::json!({ "entry": "./setup.js" }),
            ..PlayConfig::default()
        };
        let err = config
            .into_run_configuration(vec![PathBuf::from("/t/a.js")], PathBuf::from("/t"), false)
            .unwrap_err();
        assert!(matches!(
            err,
            PlayError::Config(ConfigError::InvalidBundlerConfig {
                bundler: "transpile",
                ..
            })
        ));
    }

    #[test]
    fn test_rolldown_keeps_native_options() {
        let config = RolldownConfig::from_value(serde_json::json!({
            "entry": "./setup.js",
            "define": { "__API__": "\"http://localhost\"" },
            "resolve": { "alias": [["@app", ["./src"]]] },
            "keepNames": true
        }))
        .unwrap();

        assert_eq!(config.native.len(), 3);
        let native = config.native_options().unwrap();
        let define = native.define.unwrap();
        assert_eq!(define["__API__"], "\"http://localhost\"");
        let alias = native.resolve.unwrap().alias.unwrap();
        assert_eq!(alias[0].0, "@app");
        assert_eq!(native.keep_names, Some(true));
    }

    #[test]
    fn test_rolldown_rejects_unknown_and_owned_options() {
        for (value, needle) in [
            (serde_json::json!({ "defin": {} }), "defin"),
            (serde_json::json!({ "input": ["./a.js"] }), "entry"),
            (serde_json::json!({ "format": "cjs" }), "format"),
            (serde_json::json!({ "keepNames": "yes" }), "boolean"),
        ] {
            let err = RolldownConfig::from_value(value).unwrap_err();
            let ConfigError::InvalidBundlerConfig { bundler, message } = err else {
                panic!("unexpected error: {err:?}");
            };
            assert_eq!(bundler, "rolldown");
            assert!(message.contains(needle), "{message}");
        }
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = PlayConfig::load(&cli(&[]), dir.path()).unwrap();
        assert_eq!(config, PlayConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_merges_file_and_cli() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"{
                "bundler": "transpile",
                "port": 4100,
                "timeout": 9000,
                "framework": { "script": "/vendor/mocha.js" },
                "browser": { "args": ["--lang=en"] }
            }"#,
        );

        let config = PlayConfig::load(&cli(&["-t", "100", "--chrome", "/opt/chrome"]), dir.path())
            .unwrap();

        assert_eq!(config.bundler, BundlerKind::Transpile);
        assert_eq!(config.port, 4100);
        assert_eq!(config.timeout, 100);
        assert_eq!(config.framework.script, "/vendor/mocha.js");
        assert_eq!(
            config.framework.stylesheet.as_deref(),
            Some("/node_modules/mocha/mocha.css")
        );
        assert_eq!(config.browser.args, vec!["--lang=en"]);
        assert_eq!(
            config.browser.chrome_path,
            Some(PathBuf::from("/opt/chrome"))
        );
    }

    #[test]
    #[serial]
    fn test_load_finds_file_in_ancestor() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "ui": "tdd" }"#);
        let nested = dir.path().join("packages").join("app");
        std::fs::create_dir_all(&nested).unwrap();

        let config = PlayConfig::load(&cli(&[]), &nested).unwrap();
        assert_eq!(config.ui, "tdd");
    }

    #[test]
    #[serial]
    fn test_load_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let err = PlayConfig::load(&cli(&["-c", "nope.json"]), dir.path()).unwrap_err();
        assert!(matches!(err, PlayError::Config(ConfigError::NotFound(_))));
    }

    #[test]
    #[serial]
    fn test_load_rejects_bad_file() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "iterate": "many" }"#);
        let err = PlayConfig::load(&cli(&[]), dir.path()).unwrap_err();
        assert!(matches!(err, PlayError::Config(ConfigError::Load(_))));
    }

    #[test]
    #[serial]
    fn test_load_env_between_file_and_cli() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "port": 4100, "reporter": "dot" }"#);

        // SAFETY: serialized with every other test that reads the environment
        unsafe {
            std::env::set_var("FOB_PLAY_PORT", "4200");
            std::env::set_var("FOB_PLAY_REPORTER", "tap");
        }
        let result = PlayConfig::load(&cli(&["--reporter", "min"]), dir.path());
        unsafe {
            std::env::remove_var("FOB_PLAY_PORT");
            std::env::remove_var("FOB_PLAY_REPORTER");
        }

        let config = result.unwrap();
        assert_eq!(config.port, 4200);
        assert_eq!(config.reporter.as_deref(), Some("min"));
    }
}
