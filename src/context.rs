use actix_web::HttpRequest;

use crate::database::Database;
use crate::error::Error;
use crate::user::{Role, User, UserId};

/// The identity a request acts as. Resolved once per request from the
/// `x-user-id` header and passed explicitly to the managers, which never
/// consult ambient state for authorization.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub agency_id: Option<String>,
}

impl RequestContext {
    pub fn for_user(user: &User) -> RequestContext {
        RequestContext {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            agency_id: user.agency_id.clone(),
        }
    }

    /// Admins and managers see every agency's campaigns; partners only
    /// their own.
    pub fn can_view_all(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Manager)
    }

    pub fn can_access_agency(&self, agency_id: &str) -> bool {
        self.can_view_all() || self.agency_id.as_deref() == Some(agency_id)
    }

    pub fn require_admin(&self) -> Result<(), Error> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(Error::AccessDenied)
        }
    }
}

pub async fn request_context(
    db: &dyn Database,
    request: &HttpRequest,
) -> Result<RequestContext, Error> {
    let header = request
        .headers()
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .ok_or(Error::MissingUserHeader)?;

    let user_id: UserId = header.parse().map_err(|_| Error::MissingUserHeader)?;

    let user = db
        .users()
        .fetch_user_by_id(user_id)
        .await?
        .ok_or(Error::UserNotFound { user_id })?;

    Ok(RequestContext::for_user(&user))
}
