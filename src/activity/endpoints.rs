use actix_web::web::{Data, Json, Query};
use actix_web::{get, HttpRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context;
use crate::database::{Database, MongoDatabase};
use crate::error::Error;
use crate::user::UserId;

use super::{ActivityEntry, ActivityId};

const DEFAULT_ACTIVITY_LIMIT: i64 = 100;

#[derive(Clone, Debug, Deserialize)]
struct ActivityQuery {
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ActivityBody {
    pub id: ActivityId,
    pub user_id: Option<UserId>,
    pub user_email: String,
    pub action: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityBody {
    pub fn render(entry: ActivityEntry) -> ActivityBody {
        ActivityBody {
            id: entry.id,
            user_id: entry.user_id,
            user_email: entry.user_email,
            action: entry.action,
            details: entry.details,
            created_at: entry.created_at,
        }
    }
}

#[get("/activity")]
#[tracing::instrument(skip_all)]
async fn get_activity(
    request: HttpRequest,
    db: Data<MongoDatabase>,
    query: Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityBody>>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;
    ctx.require_admin()?;

    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT).clamp(1, 1000);
    let entries = db.get_ref().activity().fetch_recent_activity(limit).await?;

    Ok(Json(entries.into_iter().map(ActivityBody::render).collect()))
}
