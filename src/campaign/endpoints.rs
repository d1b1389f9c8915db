use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, put, HttpRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bidtheatre::{AdServerCampaignDetails, HttpBidTheatre};
use crate::context;
use crate::database::{Database, MongoDatabase};
use crate::error::Error;
use crate::notify::LogNotifier;
use crate::reconcile::{AvailabilityMonitor, CampaignAvailability};

use super::draft::{BudgetSelection, CampaignDraft, CampaignInfo};
use super::{manager, BiddingStrategy, Campaign, CampaignId, CampaignMonth, Coordinates, SyncStatus};

#[derive(Clone, Debug, Deserialize)]
struct SaveCampaignBody {
    #[serde(flatten)]
    info: CampaignInfo,
    #[serde(flatten)]
    budget: BudgetSelection,
    apartment_keys: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CampaignBody {
    pub id: CampaignId,
    pub created_by: String,
    pub partner_id: String,
    pub partner_name: String,
    pub agent: String,
    pub agent_key: String,
    pub agency_id: String,
    pub campaign_address: String,
    pub campaign_postal_code: String,
    pub campaign_city: String,
    pub formatted_address: Option<String>,
    pub campaign_coordinates: Option<Coordinates>,
    pub campaign_radius: u32,
    pub campaign_start_date: CampaignMonth,
    pub campaign_end_date: Option<CampaignMonth>,
    pub channel_meta: bool,
    pub channel_display: bool,
    pub channel_pdooh: bool,
    pub budget_meta: Option<f64>,
    pub budget_display: Option<f64>,
    pub budget_pdooh: Option<f64>,
    pub budget_meta_daily: f64,
    pub budget_display_daily: f64,
    pub budget_pdooh_daily: f64,
    pub bidding_strategy: BiddingStrategy,
    pub max_cpm_display: f64,
    pub max_cpm_pdooh: f64,
    pub active: bool,
    pub apartment_keys: Vec<String>,
    pub bt_campaign_id: Option<String>,
    pub bt_sync_status: Option<SyncStatus>,
    pub bt_sync_error: Option<String>,
    pub bt_last_sync: Option<DateTime<Utc>>,
    pub cr_ad_tags: Option<String>,
    pub cr_last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignBody {
    pub async fn render(db: &dyn Database, campaign: Campaign) -> Result<CampaignBody, Error> {
        let links = db
            .campaign_apartments()
            .fetch_links_by_campaign(campaign.id)
            .await?;

        Ok(CampaignBody {
            id: campaign.id,
            created_by: campaign.created_by,
            partner_id: campaign.partner_id,
            partner_name: campaign.partner_name,
            agent: campaign.agent,
            agent_key: campaign.agent_key,
            agency_id: campaign.agency_id,
            campaign_address: campaign.campaign_address,
            campaign_postal_code: campaign.campaign_postal_code,
            campaign_city: campaign.campaign_city,
            formatted_address: campaign.formatted_address,
            campaign_coordinates: campaign.campaign_coordinates,
            campaign_radius: campaign.campaign_radius,
            campaign_start_date: campaign.campaign_start_date,
            campaign_end_date: campaign.campaign_end_date,
            channel_meta: campaign.channel_meta,
            channel_display: campaign.channel_display,
            channel_pdooh: campaign.channel_pdooh,
            budget_meta: campaign.budget_meta,
            budget_display: campaign.budget_display,
            budget_pdooh: campaign.budget_pdooh,
            budget_meta_daily: campaign.budget_meta_daily,
            budget_display_daily: campaign.budget_display_daily,
            budget_pdooh_daily: campaign.budget_pdooh_daily,
            bidding_strategy: campaign.bidding_strategy,
            max_cpm_display: campaign.max_cpm_display,
            max_cpm_pdooh: campaign.max_cpm_pdooh,
            active: campaign.active,
            apartment_keys: links.into_iter().map(|link| link.apartment_key).collect(),
            bt_campaign_id: campaign.bt_campaign_id,
            bt_sync_status: campaign.bt_sync_status,
            bt_sync_error: campaign.bt_sync_error,
            bt_last_sync: campaign.bt_last_sync,
            cr_ad_tags: campaign.cr_ad_tags,
            cr_last_updated: campaign.cr_last_updated,
            created_at: campaign.created_at,
            updated_at: campaign.updated_at,
        })
    }
}

#[post("/campaigns")]
#[tracing::instrument(skip_all)]
async fn create_campaign(
    request: HttpRequest,
    db: Data<MongoDatabase>,
    adserver: Data<HttpBidTheatre>,
    notifier: Data<LogNotifier>,
    body: Json<SaveCampaignBody>,
) -> Result<Json<CampaignBody>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;
    let body = body.into_inner();

    let draft = CampaignDraft::new(body.info, body.apartment_keys, body.budget);

    let campaign = manager::create_campaign(
        db.get_ref(),
        adserver.get_ref(),
        adserver.get_ref(),
        notifier.get_ref(),
        &ctx,
        draft,
    )
    .await?;

    Ok(Json(CampaignBody::render(db.get_ref(), campaign).await?))
}

#[put("/campaigns/{campaign_id}")]
#[tracing::instrument(skip_all)]
async fn update_campaign(
    request: HttpRequest,
    db: Data<MongoDatabase>,
    adserver: Data<HttpBidTheatre>,
    notifier: Data<LogNotifier>,
    params: Path<CampaignId>,
    body: Json<SaveCampaignBody>,
) -> Result<Json<CampaignBody>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;
    let campaign_id = params.into_inner();
    let body = body.into_inner();

    let draft = CampaignDraft::new(body.info, body.apartment_keys, body.budget);

    let campaign = manager::update_campaign(
        db.get_ref(),
        adserver.get_ref(),
        adserver.get_ref(),
        notifier.get_ref(),
        &ctx,
        campaign_id,
        draft,
    )
    .await?;

    Ok(Json(CampaignBody::render(db.get_ref(), campaign).await?))
}

#[get("/campaigns")]
#[tracing::instrument(skip_all)]
async fn get_campaigns(
    request: HttpRequest,
    db: Data<MongoDatabase>,
) -> Result<Json<Vec<CampaignBody>>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;

    let campaigns = manager::get_campaigns(db.get_ref(), &ctx).await?;

    let mut body = Vec::with_capacity(campaigns.len());
    for campaign in campaigns {
        body.push(CampaignBody::render(db.get_ref(), campaign).await?);
    }

    Ok(Json(body))
}

#[get("/campaigns/{campaign_id}")]
#[tracing::instrument(skip_all)]
async fn get_campaign_by_id(
    request: HttpRequest,
    db: Data<MongoDatabase>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;
    let campaign_id = params.into_inner();

    let campaign = manager::get_campaign_by_id(db.get_ref(), &ctx, campaign_id).await?;

    Ok(Json(CampaignBody::render(db.get_ref(), campaign).await?))
}

#[get("/campaigns/{campaign_id}/availability")]
#[tracing::instrument(skip_all)]
async fn get_campaign_availability(
    request: HttpRequest,
    db: Data<MongoDatabase>,
    monitor: Data<AvailabilityMonitor>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignAvailability>, Error> {
    let ctx = context::request_context(db.get_ref(), &request).await?;
    let campaign_id = params.into_inner();

    // authorization only; the monitor re-reads the campaign itself
    manager::get_campaign_by_id(db.get_ref(), &ctx, campaign_id).await?;

    let availability = monitor.check_campaign(campaign_id).await?;

    Ok(Json(availability))
}

#[get("/campaigns/{campaign_id}/adserver")]
#[tracing::instrument(skip_all)]
async fn get_campaign_adserver_state(
    request: HttpRequest,
    db: Data<MongoDatabase>,
    adserver: Data<HttpBidTheatre>,
    params: Path<CampaignId>,
) -> Result<Json<AdServerCampaignDetails>, Error> {
    use crate::bidtheatre::AdServerApi;

    let ctx = context::request_context(db.get_ref(), &request).await?;
    let campaign_id = params.into_inner();

    let campaign = manager::get_campaign_by_id(db.get_ref(), &ctx, campaign_id).await?;

    let external_id = campaign
        .bt_campaign_id
        .ok_or(Error::CampaignNotLinkedToAdServer { campaign_id })?;

    let details = adserver.get_campaign(&external_id).await?;

    Ok(Json(details))
}
