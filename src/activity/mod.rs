use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::typedid::{TypedId, TypedIdMarker};
use crate::user::UserId;

pub mod db;
pub mod endpoints;

pub use endpoints::*;

pub type ActivityId = TypedId<ActivityEntry>;

/// One line of the audit trail. Entries are written by the managers and by
/// the availability monitor; they are never updated or deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(rename = "_id")]
    pub id: ActivityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub user_email: String,
    pub action: String,
    pub details: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl TypedIdMarker for ActivityEntry {
    fn tag() -> &'static str {
        "LOG"
    }
}

impl ActivityEntry {
    pub fn by_user(ctx: &RequestContext, action: &str, details: String) -> ActivityEntry {
        ActivityEntry {
            id: ActivityId::new(),
            user_id: Some(ctx.user_id),
            user_email: ctx.email.clone(),
            action: action.to_string(),
            details,
            created_at: Utc::now(),
        }
    }

    /// For actions taken by the system itself, like the availability
    /// monitor pausing a campaign.
    pub fn by_system(actor: &str, action: &str, details: String) -> ActivityEntry {
        ActivityEntry {
            id: ActivityId::new(),
            user_id: None,
            user_email: actor.to_string(),
            action: action.to_string(),
            details,
            created_at: Utc::now(),
        }
    }
}
