use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn environment_layer_overrides_file_layer() {
    let file = config::File::from_str(
        "[moderation]\nsubmit_on_create = false\n[server]\nport = 4100\n",
        config::FileFormat::Toml,
    );
    let env = config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .source(Some(
            [("STORYLOFT__MODERATION__SUBMIT_ON_CREATE".to_string(), "true".to_string())]
                .into_iter()
                .collect(),
        ))
        .try_parsing(true);

    let raw: RawSettings = Config::builder()
        .add_source(file)
        .add_source(env)
        .build()
        .expect("config builds")
        .try_deserialize()
        .expect("raw settings");
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(settings.moderation.submit_on_create);
    assert_eq!(settings.server.addr.port(), 4100);
}

#[test]
fn defaults_select_memory_store_and_hour_long_access_tokens() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    assert!(settings.database.url.is_none());
    assert_eq!(settings.sessions.access_ttl, Duration::from_secs(3600));
    assert!(!settings.moderation.submit_on_create);
    assert_eq!(settings.site.public_base_url, "http://localhost:3000");
}

#[test]
fn blank_database_url_is_ignored() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn refresh_must_outlive_access() {
    let mut raw = RawSettings::default();
    raw.sessions.access_ttl_seconds = Some(600);
    raw.sessions.refresh_ttl_seconds = Some(60);

    let err = Settings::from_raw(raw).expect_err("refresh shorter than access");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "sessions.refresh_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn public_base_url_drops_trailing_slash() {
    let mut raw = RawSettings::default();
    raw.site.public_base_url = Some("https://storyloft.example/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.site.public_base_url, "https://storyloft.example");
}

#[test]
fn public_base_url_rejects_other_schemes() {
    let mut raw = RawSettings::default();
    raw.site.public_base_url = Some("ftp://storyloft.example".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn zero_rate_limit_is_rejected() {
    let mut raw = RawSettings::default();
    raw.api_rate_limit.max_requests = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero limit");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "api_rate_limit.max_requests",
            ..
        }
    ));
}

#[test]
fn forwarded_for_is_untrusted_unless_enabled() {
    let settings = Settings::from_raw(RawSettings::default()).expect("defaults");
    assert!(!settings.api_rate_limit.trust_forwarded_for);

    let mut raw = RawSettings::default();
    raw.apply_serve_overrides(&ServeOverrides {
        api_rate_limit_trust_forwarded_for: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.api_rate_limit.trust_forwarded_for);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["storyloft"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_grant_admin_arguments() {
    let args = CliArgs::parse_from([
        "storyloft",
        "users",
        "grant-admin",
        "--database-url",
        "postgres://example",
        "night_editor",
    ]);

    match args.command.expect("users command") {
        Command::Users(users) => match users.command {
            UsersCommand::GrantAdmin { database, username } => {
                assert_eq!(database.database_url.as_deref(), Some("postgres://example"));
                assert_eq!(username, "night_editor");
            }
        },
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_session_issue_arguments() {
    let args = CliArgs::parse_from(["storyloft", "sessions", "issue", "night_editor"]);
    match args.command.expect("sessions command") {
        Command::Sessions(sessions) => match sessions.command {
            SessionsCommand::Issue { database, username } => {
                assert!(database.database_url.is_none());
                assert_eq!(username, "night_editor");
            }
        },
        _ => panic!("wrong command parsed"),
    }
}
