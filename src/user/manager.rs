use chrono::Utc;

use crate::context::RequestContext;
use crate::database::Database;
use crate::error::Error;

use super::{Role, User, UserId};

#[tracing::instrument(skip(db, ctx))]
pub async fn create_user(
    db: &dyn Database,
    ctx: &RequestContext,
    email: String,
    name: String,
    role: Role,
    agent_key: Option<String>,
    partner_name: Option<String>,
    agency_id: Option<String>,
) -> Result<User, Error> {
    ctx.require_admin()?;

    if let Some(agency_id) = &agency_id {
        db.agencies()
            .fetch_agency_by_id(agency_id)
            .await?
            .ok_or_else(|| Error::AgencyNotFound {
                agency_id: agency_id.clone(),
            })?;
    }

    let user = User {
        id: UserId::new(),
        email,
        name,
        role,
        agent_key,
        partner_name,
        agency_id,
        last_login: None,
        created_at: Utc::now(),
    };

    db.users().insert_user(&user).await?;

    Ok(user)
}

#[tracing::instrument(skip(db, ctx))]
pub async fn get_users(db: &dyn Database, ctx: &RequestContext) -> Result<Vec<User>, Error> {
    ctx.require_admin()?;

    let users = db.users().fetch_users().await?;

    Ok(users)
}

#[cfg(test)]
mod tests {
    use crate::database::test::MockDatabase;

    use super::*;

    fn ctx(role: Role) -> RequestContext {
        RequestContext {
            user_id: UserId::new(),
            email: "admin@example.fi".to_string(),
            role,
            agency_id: None,
        }
    }

    #[tokio::test]
    async fn only_admins_manage_users() {
        let db = MockDatabase::new();

        let result = get_users(&db, &ctx(Role::Partner)).await;
        assert_eq!(result.unwrap_err(), Error::AccessDenied);

        let result = create_user(
            &db,
            &ctx(Role::Manager),
            "new@example.fi".to_string(),
            "New User".to_string(),
            Role::Partner,
            None,
            None,
            None,
        )
        .await;
        assert_eq!(result.unwrap_err(), Error::AccessDenied);
    }

    #[tokio::test]
    async fn partner_users_must_reference_a_known_agency() {
        let mut db = MockDatabase::new();
        db.agencies.on_fetch_agency_by_id = Box::new(|_| Ok(None));

        let result = create_user(
            &db,
            &ctx(Role::Admin),
            "new@example.fi".to_string(),
            "New User".to_string(),
            Role::Partner,
            None,
            None,
            Some("agency-404".to_string()),
        )
        .await;

        assert_eq!(
            result.unwrap_err(),
            Error::AgencyNotFound {
                agency_id: "agency-404".to_string()
            }
        );
    }
}
