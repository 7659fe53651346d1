use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let api_key_hash_salt = require("ADSCOUT_API_KEY_HASH_SALT")?;

    let env = parse_environment(&or_default("ADSCOUT_ENV", "development"));

    let bind_addr = parse_addr("ADSCOUT_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("ADSCOUT_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("ADSCOUT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("ADSCOUT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ADSCOUT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let search_stale_after_secs = parse_u64("ADSCOUT_SEARCH_STALE_AFTER_SECS", "3600")?;
    let opportunity_stale_after_days = parse_u32("ADSCOUT_OPPORTUNITY_STALE_AFTER_DAYS", "30")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        api_key_hash_salt,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        search_stale_after_secs,
        opportunity_stale_after_days,
    })
}

fn parse_environment(raw: &str) -> Environment {
    match raw.to_ascii_lowercase().as_str() {
        "production" | "prod" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env::VarError;

    fn lookup_from<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| map.get(key).map(ToString::to_string).ok_or(VarError::NotPresent)
    }

    fn minimal_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/adscout"),
            ("ADSCOUT_API_KEY_HASH_SALT", "pepper"),
        ])
    }

    #[test]
    fn minimal_env_uses_defaults() {
        let env = minimal_env();
        let config = build_app_config(lookup_from(&env)).expect("config");

        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.search_stale_after_secs, 3600);
        assert_eq!(config.opportunity_stale_after_days, 30);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let env = HashMap::from([("ADSCOUT_API_KEY_HASH_SALT", "pepper")]);
        let err = build_app_config(lookup_from(&env)).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingEnvVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn missing_salt_is_an_error() {
        let env = HashMap::from([("DATABASE_URL", "postgres://localhost/adscout")]);
        let err = build_app_config(lookup_from(&env)).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingEnvVar(var) if var == "ADSCOUT_API_KEY_HASH_SALT"));
    }

    #[test]
    fn invalid_bind_addr_is_an_error() {
        let mut env = minimal_env();
        env.insert("ADSCOUT_BIND_ADDR", "not-an-addr");
        let err = build_app_config(lookup_from(&env)).expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidEnvVar { var, .. } if var == "ADSCOUT_BIND_ADDR"));
    }

    #[test]
    fn environment_parsing_accepts_aliases() {
        assert_eq!(parse_environment("prod"), Environment::Production);
        assert_eq!(parse_environment("Production"), Environment::Production);
        assert_eq!(parse_environment("test"), Environment::Test);
        assert_eq!(parse_environment("anything-else"), Environment::Development);
    }

    #[test]
    fn debug_redacts_secrets() {
        let env = minimal_env();
        let config = build_app_config(lookup_from(&env)).expect("config");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("pepper"));
        assert!(!rendered.contains("postgres://localhost/adscout"));
        assert!(rendered.contains("[redacted]"));
    }
}
