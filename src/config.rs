use std::env;
use std::fmt::Debug;
use std::str::FromStr;

use tracing::warn;

/// Runtime configuration, loaded once at startup from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: String,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub apartment_feed_url: String,
    pub adserver_api_url: String,
    pub adserver_network_id: String,
    pub adserver_username: String,
    pub adserver_password: String,
    pub reconcile_interval_secs: u64,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn load() -> Config {
        Config {
            listen_addr: env_or("LISTEN_ADDR", "127.0.0.1:8080"),
            mongodb_uri: env_or("MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_database: env_or("MONGODB_DATABASE", "adops"),
            apartment_feed_url: env_or(
                "APARTMENT_FEED_URL",
                "https://vilpas.kiinteistomaailma.fi/export/km/listings/baseline.json",
            ),
            adserver_api_url: env_or("ADSERVER_API_URL", "https://api.bidtheatre.com/v2.0"),
            adserver_network_id: env_or("ADSERVER_NETWORK_ID", "bidtheatre"),
            adserver_username: env_or("ADSERVER_USERNAME", ""),
            adserver_password: env_or("ADSERVER_PASSWORD", ""),
            reconcile_interval_secs: env_parse_or("RECONCILE_INTERVAL_SECS", 300),
            seed_demo_data: env_parse_or("SEED_DEMO_DATA", false),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Debug,
{
    match env::var(key) {
        Ok(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("could not parse {}={:?}, using {:?}", key, value, default);
                default
            }
        },
        Err(_) => default,
    }
}
