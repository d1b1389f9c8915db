use actix_web::web::{Data, Json};
use actix_web::{get, HttpRequest};
use serde::Serialize;

use crate::context;
use crate::database::{Database, MongoDatabase};
use crate::error::Error;

use super::Agency;

#[derive(Clone, Debug, Serialize)]
pub struct AgencyBody {
    pub agency_id: String,
    pub name: String,
    pub email: Option<String>,
}

impl AgencyBody {
    pub fn render(agency: Agency) -> AgencyBody {
        AgencyBody {
            agency_id: agency.agency_id,
            name: agency.name,
            email: agency.email,
        }
    }
}

/// Every signed-in user can list agencies; the campaign form needs them.
#[get("/agencies")]
#[tracing::instrument(skip_all)]
async fn get_agencies(
    request: HttpRequest,
    db: Data<MongoDatabase>,
) -> Result<Json<Vec<AgencyBody>>, Error> {
    context::request_context(db.get_ref(), &request).await?;

    let agencies = db.get_ref().agencies().fetch_agencies().await?;

    Ok(Json(agencies.into_iter().map(AgencyBody::render).collect()))
}
