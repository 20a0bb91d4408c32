use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{config_error, Error};

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_address: SocketAddr,
    pub session_ttl: chrono::Duration,
    pub feed_poll_interval: Duration,
    pub admin: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        let session_ttl_hours: i64 = get_env_or("SESSION_TTL_HOURS", 24)?;
        if session_ttl_hours <= 0 {
            return Err(config_error("SESSION_TTL_HOURS"));
        }

        let admin = match (env::var("ADMIN_EMAIL").ok(), env::var("ADMIN_PASSWORD").ok()) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            _ => return Err(config_error("ADMIN_EMAIL and ADMIN_PASSWORD go together")),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: get_env_or("DATABASE_MAX_CONNECTIONS", 5)?,
            bind_address: get_env_or("BIND_ADDRESS", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            session_ttl: chrono::Duration::hours(session_ttl_hours),
            feed_poll_interval: Duration::from_secs(get_env_or("FEED_POLL_INTERVAL_SECS", 5)?),
            admin,
        })
    }
}

fn get_env_or<T: FromStr>(name: &str, default: T) -> Result<T, Error> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| config_error(name)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err.into()),
    }
}

#[test]
fn unset_variables_fall_back_to_defaults() {
    let value: u32 = get_env_or("COCHER_TEST_SURELY_UNSET", 7).unwrap();
    assert_eq!(value, 7);
}

#[test]
fn malformed_variables_are_config_errors() {
    env::set_var("COCHER_TEST_MALFORMED_PORT", "not-a-number");

    let err = get_env_or::<u32>("COCHER_TEST_MALFORMED_PORT", 5).unwrap_err();
    assert_eq!(err.code, 7);
}
