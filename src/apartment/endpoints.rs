use std::collections::BTreeMap;

use actix_web::web::{Data, Json};
use actix_web::{get, HttpRequest};
use serde::Serialize;

use crate::apartment::feed::ApartmentFeed;
use crate::context::{self, RequestContext};
use crate::database::MongoDatabase;
use crate::error::Error;

use super::feed::HttpApartmentFeed;
use super::Apartment;

fn visible_to(ctx: &RequestContext, apartment: &Apartment) -> bool {
    if ctx.can_view_all() {
        return true;
    }
    if apartment.agency.as_deref() == ctx.agency_id.as_deref() && apartment.agency.is_some() {
        return true;
    }
    apartment
        .agent
        .as_ref()
        .and_then(|agent| agent.email.as_deref())
        .map(|email| email.eq_ignore_ascii_case(&ctx.email))
        .unwrap_or(false)
}

#[get("/apartments")]
#[tracing::instrument(skip_all)]
async fn get_apartments(
    request: HttpRequest,
    db: Data<MongoDatabase>,
    feed: Data<HttpApartmentFeed>,
) -> Result<Json<Vec<Apartment>>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;

    let apartments = feed.fetch_apartments().await?;

    let visible = apartments
        .into_iter()
        .filter(|apartment| visible_to(&ctx, apartment))
        .collect();

    Ok(Json(visible))
}

#[derive(Clone, Debug, Serialize)]
pub struct ContactBody {
    pub agency: Option<String>,
    pub agent_name: Option<String>,
    pub agent_email: String,
    pub apartment_count: usize,
}

/// Agent contact list derived from the live feed: one row per distinct
/// agent email, with how many listings they currently carry.
#[get("/contacts")]
#[tracing::instrument(skip_all)]
async fn get_contacts(
    request: HttpRequest,
    db: Data<MongoDatabase>,
    feed: Data<HttpApartmentFeed>,
) -> Result<Json<Vec<ContactBody>>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;

    let apartments = feed.fetch_apartments().await?;

    let mut contacts: BTreeMap<String, ContactBody> = BTreeMap::new();
    for apartment in apartments
        .iter()
        .filter(|apartment| visible_to(&ctx, apartment))
    {
        let agent = match &apartment.agent {
            Some(agent) => agent,
            None => continue,
        };
        let email = match &agent.email {
            Some(email) => email.to_ascii_lowercase(),
            None => continue,
        };

        let entry = contacts.entry(email.clone()).or_insert_with(|| ContactBody {
            agency: apartment.agency.clone(),
            agent_name: agent.name.clone(),
            agent_email: email,
            apartment_count: 0,
        });
        entry.apartment_count += 1;
    }

    Ok(Json(contacts.into_values().collect()))
}
