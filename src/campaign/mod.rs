use std::fmt::{Debug, Display};
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{de, Deserialize, Serialize};

use crate::typedid::{TypedId, TypedIdMarker};
use crate::user::UserId;

pub mod budget;
pub mod db;
pub mod draft;
pub mod endpoints;
pub mod manager;
pub mod sync;

pub use endpoints::*;

pub type CampaignId = TypedId<Campaign>;

/// A marketing campaign for a set of apartment listings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub id: CampaignId,
    pub user_id: UserId,
    pub created_by: String,

    pub partner_id: String,
    pub partner_name: String,
    pub agent: String,
    pub agent_key: String,
    pub agency_id: String,

    pub campaign_address: String,
    pub campaign_postal_code: String,
    pub campaign_city: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub campaign_coordinates: Option<Coordinates>,
    pub campaign_radius: u32,

    pub campaign_start_date: CampaignMonth,
    #[serde(default)]
    pub campaign_end_date: Option<CampaignMonth>,

    pub channel_meta: bool,
    pub channel_display: bool,
    pub channel_pdooh: bool,
    #[serde(default)]
    pub budget_meta: Option<f64>,
    #[serde(default)]
    pub budget_display: Option<f64>,
    #[serde(default)]
    pub budget_pdooh: Option<f64>,
    pub budget_meta_daily: f64,
    pub budget_display_daily: f64,
    pub budget_pdooh_daily: f64,
    pub bidding_strategy: BiddingStrategy,
    pub max_cpm_display: f64,
    pub max_cpm_pdooh: f64,

    pub active: bool,

    #[serde(default)]
    pub bt_campaign_id: Option<String>,
    #[serde(default)]
    pub bt_sync_status: Option<SyncStatus>,
    #[serde(default)]
    pub bt_sync_error: Option<String>,
    #[serde(default)]
    pub bt_last_sync: Option<DateTime<Utc>>,

    #[serde(default)]
    pub cr_ad_tags: Option<String>,
    #[serde(default)]
    pub cr_last_updated: Option<DateTime<Utc>>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl TypedIdMarker for Campaign {
    fn tag() -> &'static str {
        "CMP"
    }
}

impl Campaign {
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = Vec::new();
        if self.channel_meta {
            channels.push(Channel::Meta);
        }
        if self.channel_display {
            channels.push(Channel::Display);
        }
        if self.channel_pdooh {
            channels.push(Channel::Pdooh);
        }
        channels
    }

    pub fn total_budget(&self) -> f64 {
        self.budget_meta.unwrap_or(0.0)
            + self.budget_display.unwrap_or(0.0)
            + self.budget_pdooh.unwrap_or(0.0)
    }

    /// Only display and DOOH inventory is bought through the ad server;
    /// Meta-only or inactive campaigns are never pushed.
    pub fn is_sync_eligible(&self) -> bool {
        (self.channel_display || self.channel_pdooh) && self.active
    }

    pub fn uses_adserver_channels(&self) -> bool {
        self.channel_display || self.channel_pdooh
    }
}

/// Links a campaign to one advertised apartment listing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignApartment {
    #[serde(rename = "_id")]
    pub id: CampaignApartmentId,
    pub campaign_id: CampaignId,
    pub apartment_key: String,
    pub active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

pub type CampaignApartmentId = TypedId<CampaignApartment>;

impl TypedIdMarker for CampaignApartment {
    fn tag() -> &'static str {
        "CPA"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Meta,
    Display,
    Pdooh,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Meta => "Meta",
            Channel::Display => "Display",
            Channel::Pdooh => "PDOOH",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiddingStrategy {
    #[default]
    Even,
    Asap,
    Frontloaded,
    Guaranteed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Geocoding failures are stored as (0, 0); such coordinates must not
    /// be turned into geo targeting.
    pub fn is_set(&self) -> bool {
        self.lat != 0.0 || self.lng != 0.0
    }
}

/// A calendar month, the granularity campaigns are scheduled at. Rendered
/// as `"MM/YYYY"` everywhere: the API, the database, and log output.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CampaignMonth {
    year: i32,
    month: u32,
}

impl CampaignMonth {
    pub fn new(year: i32, month: u32) -> Option<CampaignMonth> {
        if (1..=12).contains(&month) {
            Some(CampaignMonth { year, month })
        } else {
            None
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("month is validated on construction")
    }

    pub fn last_day(&self) -> NaiveDate {
        let next = if self.month == 12 {
            CampaignMonth { year: self.year + 1, month: 1 }
        } else {
            CampaignMonth { year: self.year, month: self.month + 1 }
        };
        next.first_day()
            .pred_opt()
            .expect("first day of a month has a predecessor")
    }
}

impl From<NaiveDate> for CampaignMonth {
    fn from(date: NaiveDate) -> CampaignMonth {
        CampaignMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl Display for CampaignMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

impl Debug for CampaignMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Display::fmt(self, f)
    }
}

impl FromStr for CampaignMonth {
    type Err = CampaignMonthParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (month, year) = s.split_once('/').ok_or(CampaignMonthParseError)?;
        let month: u32 = month.parse().map_err(|_| CampaignMonthParseError)?;
        let year: i32 = year.parse().map_err(|_| CampaignMonthParseError)?;
        CampaignMonth::new(year, month).ok_or(CampaignMonthParseError)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct CampaignMonthParseError;

impl Display for CampaignMonthParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "expected a month formatted as MM/YYYY")
    }
}

impl Serialize for CampaignMonth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CampaignMonth {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CampaignMonth::from_str(&s).map_err(de::Error::custom)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_renders_with_zero_padding() {
        let month = CampaignMonth::new(2024, 3).unwrap();
        assert_eq!(month.to_string(), "03/2024");
        assert_eq!("03/2024".parse::<CampaignMonth>().unwrap(), month);
    }

    #[test]
    fn month_rejects_out_of_range_values() {
        assert!(CampaignMonth::new(2024, 0).is_none());
        assert!(CampaignMonth::new(2024, 13).is_none());
        assert!("13/2024".parse::<CampaignMonth>().is_err());
        assert!("2024-03".parse::<CampaignMonth>().is_err());
    }

    #[test]
    fn month_expands_to_calendar_bounds() {
        let month = CampaignMonth::new(2024, 2).unwrap();
        assert_eq!(month.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(month.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let december = CampaignMonth::new(2023, 12).unwrap();
        assert_eq!(december.last_day(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn months_order_chronologically() {
        let earlier = CampaignMonth::new(2023, 12).unwrap();
        let later = CampaignMonth::new(2024, 1).unwrap();
        assert!(earlier < later);
    }
}
