use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

pub mod db;
pub mod endpoints;

pub use endpoints::*;

/// A partner agency, keyed by the id the apartment feed uses for it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agency {
    #[serde(rename = "_id")]
    pub agency_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
