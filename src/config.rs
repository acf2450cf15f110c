//! Runtime configuration read from the environment (and `.env`, if present).
//!
//! | Variable                | Required | Default                      |
//! |-------------------------|----------|------------------------------|
//! | `DATABASE_URL`          | yes      | --                           |
//! | `COPUS_MAX_CONNECTIONS` | no       | `5`                          |
//! | `RUST_LOG`              | no       | `copus_observations=info`    |

use crate::error::ObservationError;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_LOG_FILTER: &str = "copus_observations=info";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ObservationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ObservationError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                ObservationError::Config(
                    "DATABASE_URL must be set to a production Postgres instance".to_string(),
                )
            })?;

        let max_connections = match lookup("COPUS_MAX_CONNECTIONS") {
            Some(value) => value.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                ObservationError::Config(format!(
                    "COPUS_MAX_CONNECTIONS must be a positive integer, got '{value}'"
                ))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_pool_size() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/copus")]))
            .unwrap();
        assert_eq!(config.database_url, "postgres://localhost/copus");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn requires_database_url() {
        assert_matches!(
            Config::from_lookup(lookup(&[])),
            Err(ObservationError::Config(_))
        );
        assert_matches!(
            Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])),
            Err(ObservationError::Config(_))
        );
    }

    #[test]
    fn parses_pool_size() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/copus"),
            ("COPUS_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 12);

        assert_matches!(
            Config::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/copus"),
                ("COPUS_MAX_CONNECTIONS", "zero"),
            ])),
            Err(ObservationError::Config(_))
        );
    }
}
