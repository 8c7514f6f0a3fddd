use dotenv::dotenv;
use std::env::{self, VarError};

/// Startup configuration, resolved once in `main` and managed as Rocket
/// state. The JWT secret is handed to the auth code explicitly instead of
/// being read from the environment at every use.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret: String,
}

impl Config {
    pub fn from_env() -> Result<Config, VarError> {
        dotenv().ok();
        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            secret: env::var("JWT_SECRET")?,
        })
    }
}
