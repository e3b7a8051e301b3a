use anyhow::Context;

use crate::attendance::DEFAULT_TARGET;
use crate::error::TrackerError;

/// Runtime configuration loaded from the environment (and `.env`).
///
/// | Env Var                    | Default |
/// |----------------------------|---------|
/// | `DATABASE_URL`             | required |
/// | `DATABASE_MAX_CONNECTIONS` | `5`     |
/// | `ATTENDANCE_TARGET`        | `75`    |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    /// Target attendance percentage used when a command gets no `--target`.
    pub target: f64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .context("DATABASE_URL must be set to a Postgres instance")?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            None => 5,
        };

        let target = match lookup("ATTENDANCE_TARGET") {
            Some(value) => value
                .trim()
                .parse()
                .context("ATTENDANCE_TARGET must be a number")?,
            None => DEFAULT_TARGET,
        };

        Ok(Self {
            database_url,
            max_connections,
            target: validate_target(target)?,
        })
    }
}

pub fn validate_target(target: f64) -> Result<f64, TrackerError> {
    if (0.0..=100.0).contains(&target) {
        Ok(target)
    } else {
        Err(TrackerError::Validation(format!(
            "target percentage must be between 0 and 100, got {target}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/attendance")]).unwrap();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.target, 75.0);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/attendance"),
            ("DATABASE_MAX_CONNECTIONS", "2"),
            ("ATTENDANCE_TARGET", " 80 "),
        ])
        .unwrap();
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.target, 80.0);
    }

    #[test]
    fn missing_database_url_is_rejected() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn target_outside_percentage_range_is_rejected() {
        let result = config_from(&[
            ("DATABASE_URL", "postgres://localhost/attendance"),
            ("ATTENDANCE_TARGET", "120"),
        ]);
        assert!(result.is_err());
        assert!(validate_target(-1.0).is_err());
        assert_eq!(validate_target(0.0).unwrap(), 0.0);
        assert_eq!(validate_target(100.0).unwrap(), 100.0);
    }
}
