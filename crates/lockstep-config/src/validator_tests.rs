    use super::*;
    use std::path::PathBuf;

    fn config_with_token() -> Config {
        let mut config = Config::default();
        config.client.auth_token = Some("token".to_string());
        config
    }

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "client.auth_token"));
    }

    #[test]
    fn test_validate_config_with_token_is_clean() {
        let result = ConfigValidator::validate(&config_with_token()).unwrap();
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_validate_zero_attach_timeout() {
        let mut config = config_with_token();
        config.hooks.attach_timeout_secs = 0;

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "hooks.attach_timeout_secs"));
    }

    #[test]
    fn test_validate_zero_decision_timeout() {
        let mut config = config_with_token();
        config.sequence.decision_timeout_secs = Some(0);

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.path == "sequence.decision_timeout_secs"));
    }

    #[test]
    fn test_validate_unknown_policy() {
        let mut config = config_with_token();
        config.client.on_failure = "later".to_string();

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
        let error = result
            .errors
            .iter()
            .find(|e| e.path == "client.on_failure")
            .unwrap();
        assert!(error.message.contains("later"));
    }

    #[test]
    fn test_validate_unknown_log_level() {
        let mut config = config_with_token();
        config.logging.level = "verbose".to_string();

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "logging.level"));
    }

    #[test]
    fn test_validate_filter_directives() {
        let mut config = config_with_token();
        config.logging.level = "info,lockstep_core=debug".to_string();

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_validate_bad_directive_among_good_ones() {
        let mut config = config_with_token();
        config.logging.level = "info,lockstep_core=loud".to_string();

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_validate_log_file_without_name() {
        let mut config = config_with_token();
        config.logging.file = Some(PathBuf::from("/"));

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.errors.iter().any(|e| e.path == "logging.file"));
    }

    #[test]
    fn test_unbounded_retries_with_retry_policy_warns() {
        let mut config = config_with_token();
        config.sequence.max_retries = 0;
        config.client.on_failure = "retry".to_string();

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "sequence.max_retries"));
    }

    #[test]
    fn test_unbounded_retries_with_abort_policy_is_quiet() {
        let mut config = config_with_token();
        config.sequence.max_retries = 0;

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_into_result() {
        let mut config = config_with_token();
        config.hooks.attach_timeout_secs = 0;
        config.client.on_failure = "retyr".to_string();

        let err = ConfigValidator::validate(&config)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Rejected(ref errors) if errors.len() == 2));
        assert_eq!(
            err.rejected_paths(),
            vec!["hooks.attach_timeout_secs", "client.on_failure"]
        );

        let warnings = ConfigValidator::validate(&Config::default())
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_validation_result_methods() {
        let mut result = ValidationResult::default();
        assert!(result.is_valid());

        result.add_warning(ValidationWarning::new("test", "warning"));
        assert!(result.is_valid());

        result.add_error(ValidationError::new("test", "error"));
        assert!(!result.is_valid());
    }
