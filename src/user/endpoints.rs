use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context;
use crate::database::MongoDatabase;
use crate::error::Error;

use super::{manager, Role, User, UserId};

#[derive(Clone, Debug, Deserialize)]
struct CreateUserBody {
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub agent_key: Option<String>,
    #[serde(default)]
    pub partner_name: Option<String>,
    #[serde(default)]
    pub agency_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserBody {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub agent_key: Option<String>,
    pub partner_name: Option<String>,
    pub agency_id: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserBody {
    pub fn render(user: User) -> UserBody {
        UserBody {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            agent_key: user.agent_key,
            partner_name: user.partner_name,
            agency_id: user.agency_id,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

#[post("/users")]
#[tracing::instrument(skip_all)]
async fn create_user(
    request: HttpRequest,
    db: Data<MongoDatabase>,
    body: Json<CreateUserBody>,
) -> Result<Json<UserBody>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;
    let body = body.into_inner();

    let user = manager::create_user(
        db.get_ref(),
        &ctx,
        body.email,
        body.name,
        body.role,
        body.agent_key,
        body.partner_name,
        body.agency_id,
    )
    .await?;

    Ok(Json(UserBody::render(user)))
}

#[get("/users")]
#[tracing::instrument(skip_all)]
async fn get_users(
    request: HttpRequest,
    db: Data<MongoDatabase>,
) -> Result<Json<Vec<UserBody>>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;

    let users = manager::get_users(db.get_ref(), &ctx).await?;

    Ok(Json(users.into_iter().map(UserBody::render).collect()))
}
