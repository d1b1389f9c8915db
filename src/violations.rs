use serde::{Deserialize, Serialize};

use crate::campaign::{CampaignMonth, Channel};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING-KEBAB-CASE")]
pub enum Violation {
    MissingRequiredField {
        field: String,
    },
    RadiusNotPositive {
        radius: u32,
    },
    NoChannelEnabled,
    NoApartmentsSelected,
    MissingChannelBudget {
        channel: Channel,
    },
    NonPositiveChannelBudget {
        channel: Channel,
        budget: f64,
    },
    NonPositiveMaxCpm {
        channel: Channel,
        max_cpm: f64,
    },
    EndsBeforeStart {
        start: CampaignMonth,
        end: CampaignMonth,
    },
}
