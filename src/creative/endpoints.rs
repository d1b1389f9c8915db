use actix_web::web::{Data, Json, Path};
use actix_web::{get, HttpRequest};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::campaign::CampaignId;
use crate::context;
use crate::database::MongoDatabase;
use crate::error::Error;

use super::{manager, render_embed_html, AdCreative, CreativeId};

#[derive(Clone, Debug, Serialize)]
pub struct CreativeBody {
    pub id: CreativeId,
    pub campaign_id: CampaignId,
    pub apartment_key: String,
    pub target_id: String,
    pub name: String,
    pub size: String,
    pub width: u32,
    pub height: u32,
    pub bt_creative_id: Option<String>,
    pub embed_html: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreativeBody {
    pub fn render(creative: AdCreative) -> CreativeBody {
        let embed_html = render_embed_html(&creative);
        CreativeBody {
            id: creative.id,
            campaign_id: creative.campaign_id,
            apartment_key: creative.apartment_key,
            target_id: creative.target_id,
            name: creative.name,
            size: creative.size,
            width: creative.width,
            height: creative.height,
            bt_creative_id: creative.bt_creative_id,
            embed_html,
            created_at: creative.created_at,
            updated_at: creative.updated_at,
        }
    }
}

#[get("/creatives")]
#[tracing::instrument(skip_all)]
async fn get_creatives(
    request: HttpRequest,
    db: Data<MongoDatabase>,
) -> Result<Json<Vec<CreativeBody>>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;

    let creatives = manager::get_creatives(db.get_ref(), &ctx).await?;

    Ok(Json(creatives.into_iter().map(CreativeBody::render).collect()))
}

#[get("/campaigns/{campaign_id}/creatives")]
#[tracing::instrument(skip_all)]
async fn get_creatives_by_campaign(
    request: HttpRequest,
    db: Data<MongoDatabase>,
    params: Path<CampaignId>,
) -> Result<Json<Vec<CreativeBody>>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;
    let campaign_id = params.into_inner();

    let creatives = manager::get_creatives_by_campaign(db.get_ref(), &ctx, campaign_id).await?;

    Ok(Json(creatives.into_iter().map(CreativeBody::render).collect()))
}
