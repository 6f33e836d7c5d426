use crate::AppConfig;

#[test]
fn load_applies_defaults() {
    figment::Jail::expect_with(|jail| {
        jail.create_dir("config")?;
        jail.create_file(
            "config/default.toml",
            r#"
                [sso]
                address = "http://localhost:44044"
            "#,
        )?;

        let config = AppConfig::load("config").expect("config should load");

        assert_eq!(config.app_name, "warden");
        assert_eq!(config.app_env, "development");
        assert!(config.is_development());
        assert_eq!(config.sso.address, "http://localhost:44044");
        assert_eq!(config.sso.timeout_secs, 5);
        assert_eq!(config.sso.retries_count, 5);
        assert!(config.sso.insecure);
        assert!(!config.sso.required);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.rate, 0);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.public_methods.is_empty());
        Ok(())
    });
}

#[test]
fn env_overrides_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_dir("config")?;
        jail.create_file(
            "config/default.toml",
            r#"
                [sso]
                address = "http://localhost:44044"

                [rate_limit]
                rate = 10
                capacity = 20
            "#,
        )?;
        jail.set_env("WARDEN_SSO__ADDRESS", "http://sso.internal:44044");
        jail.set_env("WARDEN_SSO__REQUIRED", "true");

        let config = AppConfig::load("config").expect("config should load");

        assert_eq!(config.sso.address, "http://sso.internal:44044");
        assert!(config.sso.required);
        assert_eq!(config.rate_limit.rate, 10);
        assert_eq!(config.rate_limit.capacity, 20);
        Ok(())
    });
}

#[test]
fn environment_file_wins_over_default() {
    figment::Jail::expect_with(|jail| {
        jail.create_dir("config")?;
        jail.create_file(
            "config/default.toml",
            r#"
                app_env = "development"

                [sso]
                address = "http://localhost:44044"
            "#,
        )?;
        jail.create_file(
            "config/production.toml",
            r#"
                app_env = "production"

                [sso]
                address = "http://sso.prod:44044"
                insecure = false
            "#,
        )?;
        jail.set_env("APP_ENV", "production");

        let config = AppConfig::load("config").expect("config should load");

        assert!(config.is_production());
        assert_eq!(config.sso.address, "http://sso.prod:44044");
        assert!(!config.sso.insecure);
        Ok(())
    });
}

#[test]
fn public_methods_list_parses() {
    figment::Jail::expect_with(|jail| {
        jail.create_dir("config")?;
        jail.create_file(
            "config/default.toml",
            r#"
                public_methods = [
                    "/management.Management/ListPlans",
                    "/management.Management/GetPlan",
                ]

                [sso]
                address = "http://localhost:44044"
            "#,
        )?;

        let config = AppConfig::load("config").expect("config should load");

        assert_eq!(
            config.public_methods,
            vec![
                "/management.Management/ListPlans",
                "/management.Management/GetPlan",
            ]
        );
        Ok(())
    });
}
