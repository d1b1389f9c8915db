use serde::{Deserialize, Serialize};

pub mod endpoints;
pub mod feed;

pub use endpoints::*;

/// One listing from the availability feed. The feed is the source of truth
/// for what is on the market; listings are never stored locally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Apartment {
    pub key: String,
    pub address: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub images: Vec<ApartmentImage>,
    #[serde(default)]
    pub agent: Option<ApartmentAgent>,
    #[serde(default, rename = "agencyEmail")]
    pub agency_email: Option<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApartmentImage {
    pub url: String,
    #[serde(default, rename = "type")]
    pub image_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApartmentAgent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
