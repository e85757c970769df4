use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use chrono::Duration;
use log::{info, warn};

use crate::geo::Geofence;
use crate::models::Location;

pub const DEFAULT_PORT: u16 = 3000;
pub const CLASSROOM_LAT: f64 = 18.4725;
pub const CLASSROOM_LON: f64 = 74.0015;
pub const ALLOWED_RADIUS_METERS: f64 = 50.0;
pub const TOKEN_VALIDITY_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub base_url: String,
    pub db_path: PathBuf,
    pub geofence: Geofence,
    pub token_validity: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            base_url: default_base_url(DEFAULT_PORT),
            db_path: PathBuf::from("db.json"),
            geofence: Geofence::new(
                Location::new(CLASSROOM_LAT, CLASSROOM_LON),
                ALLOWED_RADIUS_METERS,
            ),
            token_validity: Duration::minutes(TOKEN_VALIDITY_MINUTES),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let port = try_load("PORT", DEFAULT_PORT);
        let base_url = var("BASE_URL").unwrap_or_else(|_| {
            let url = default_base_url(port);
            info!("BASE_URL not set, using default: {url}");
            url
        });
        let lat = try_load("CLASSROOM_LAT", CLASSROOM_LAT);
        let lon = try_load("CLASSROOM_LON", CLASSROOM_LON);
        let radius = try_load("ALLOWED_RADIUS_METERS", ALLOWED_RADIUS_METERS);
        let minutes = try_load("TOKEN_VALIDITY_MINUTES", TOKEN_VALIDITY_MINUTES);

        Self {
            port,
            base_url,
            db_path: PathBuf::from(try_load("DB_PATH", String::from("db.json"))),
            geofence: Geofence::new(Location::new(lat, lon), radius),
            token_validity: Duration::minutes(minutes),
        }
    }
}

fn default_base_url(port: u16) -> String {
    format!("http://192.168.1.5:{port}")
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| ())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
