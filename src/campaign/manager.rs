use chrono::{DateTime, Utc};
use tracing::warn;

use crate::activity::ActivityEntry;
use crate::bidtheatre::{AdServerApi, CreativeUploader};
use crate::context::RequestContext;
use crate::database::Database;
use crate::error::Error;
use crate::notify::{Notifier, SaveAction};

use super::draft::CampaignDraft;
use super::{sync, Campaign, CampaignId, SyncStatus};

/// Actor name the availability monitor writes to the audit trail.
pub const MONITOR_ACTOR: &str = "availability-monitor";

#[tracing::instrument(skip_all)]
pub async fn create_campaign(
    db: &dyn Database,
    adserver: &dyn AdServerApi,
    uploader: &dyn CreativeUploader,
    notifier: &dyn Notifier,
    ctx: &RequestContext,
    draft: CampaignDraft,
) -> Result<Campaign, Error> {
    draft
        .validate()
        .map_err(|violations| Error::CampaignViolatesRules { violations })?;

    if !ctx.can_access_agency(&draft.info().agency_id) {
        return Err(Error::AccessDenied);
    }

    let now = Utc::now();
    let mut campaign = campaign_from_draft(ctx, &draft, CampaignId::new(), now, None);

    db.campaigns().insert_campaign(&campaign).await?;
    db.campaign_apartments()
        .replace_links(campaign.id, draft.apartment_keys(), now)
        .await?;

    if campaign.is_sync_eligible() {
        let record = sync::sync_campaign(db, adserver, uploader, &campaign).await?;
        apply_sync_record(&mut campaign, record);
    }

    db.activity()
        .record_activity(&ActivityEntry::by_user(
            ctx,
            "create_campaign",
            format!("Created campaign: {}", campaign.id),
        ))
        .await?;

    notify(notifier, SaveAction::Created, &campaign, ctx).await;

    Ok(campaign)
}

#[tracing::instrument(skip_all, fields(campaign_id = %campaign_id))]
pub async fn update_campaign(
    db: &dyn Database,
    adserver: &dyn AdServerApi,
    uploader: &dyn CreativeUploader,
    notifier: &dyn Notifier,
    ctx: &RequestContext,
    campaign_id: CampaignId,
    draft: CampaignDraft,
) -> Result<Campaign, Error> {
    draft
        .validate()
        .map_err(|violations| Error::CampaignViolatesRules { violations })?;

    let existing = db
        .campaigns()
        .fetch_campaign_by_id(campaign_id)
        .await?
        .ok_or(Error::CampaignNotFound { campaign_id })?;

    if !ctx.can_access_agency(&existing.agency_id)
        || !ctx.can_access_agency(&draft.info().agency_id)
    {
        return Err(Error::AccessDenied);
    }

    let now = Utc::now();
    let mut campaign = campaign_from_draft(ctx, &draft, campaign_id, now, Some(&existing));

    db.campaigns()
        .update_campaign(&campaign, existing.updated_at)
        .await?;
    db.campaign_apartments()
        .replace_links(campaign.id, draft.apartment_keys(), now)
        .await?;

    if campaign.is_sync_eligible() {
        let record = sync::sync_campaign(db, adserver, uploader, &campaign).await?;
        apply_sync_record(&mut campaign, record);
    }

    db.activity()
        .record_activity(&ActivityEntry::by_user(
            ctx,
            "update_campaign",
            format!("Updated campaign: {}", campaign.id),
        ))
        .await?;

    notify(notifier, SaveAction::Updated, &campaign, ctx).await;

    Ok(campaign)
}

#[tracing::instrument(skip(db, ctx))]
pub async fn get_campaigns(
    db: &dyn Database,
    ctx: &RequestContext,
) -> Result<Vec<Campaign>, Error> {
    let campaigns = if ctx.can_view_all() {
        db.campaigns().fetch_campaigns().await?
    } else {
        match &ctx.agency_id {
            Some(agency_id) => db.campaigns().fetch_campaigns_by_agency(agency_id).await?,
            None => vec![],
        }
    };

    Ok(campaigns)
}

#[tracing::instrument(skip(db, ctx))]
pub async fn get_campaign_by_id(
    db: &dyn Database,
    ctx: &RequestContext,
    campaign_id: CampaignId,
) -> Result<Campaign, Error> {
    let campaign = db
        .campaigns()
        .fetch_campaign_by_id(campaign_id)
        .await?
        .ok_or(Error::CampaignNotFound { campaign_id })?;

    if !ctx.can_access_agency(&campaign.agency_id) {
        return Err(Error::AccessDenied);
    }

    Ok(campaign)
}

/// Deactivates a campaign whose advertised apartments are gone, and pushes
/// the paused state to the ad server so spend stops there too. Idempotent
/// for already-paused campaigns.
#[tracing::instrument(skip(db, adserver, uploader, campaign), fields(campaign_id = %campaign.id))]
pub async fn pause_campaign(
    db: &dyn Database,
    adserver: &dyn AdServerApi,
    uploader: &dyn CreativeUploader,
    campaign: &Campaign,
    sold_keys: &[String],
    actor: &str,
) -> Result<Campaign, Error> {
    if !campaign.active {
        return Ok(campaign.clone());
    }

    let now = Utc::now();
    db.campaigns()
        .set_campaign_active(campaign.id, false, now)
        .await?;

    let paused = Campaign {
        active: false,
        updated_at: now,
        ..campaign.clone()
    };

    db.activity()
        .record_activity(&ActivityEntry::by_system(
            actor,
            "pause_campaign",
            format!(
                "Campaign {} paused - apartments no longer available: {}",
                paused.id,
                sold_keys.join(", ")
            ),
        ))
        .await?;

    if paused.uses_adserver_channels() {
        sync::sync_campaign(db, adserver, uploader, &paused).await?;
    }

    Ok(paused)
}

fn campaign_from_draft(
    ctx: &RequestContext,
    draft: &CampaignDraft,
    campaign_id: CampaignId,
    now: DateTime<Utc>,
    existing: Option<&Campaign>,
) -> Campaign {
    let info = draft.info();
    let budget = draft.budget();

    let sync_eligible =
        (budget.channel_display || budget.channel_pdooh) && info.active;

    Campaign {
        id: campaign_id,
        user_id: existing.map(|c| c.user_id).unwrap_or(ctx.user_id),
        created_by: existing
            .map(|c| c.created_by.clone())
            .unwrap_or_else(|| ctx.email.clone()),
        partner_id: info.partner_id.clone(),
        partner_name: info.partner_name.clone(),
        agent: info.agent.clone(),
        agent_key: info.agent_key.clone(),
        agency_id: info.agency_id.clone(),
        campaign_address: info.campaign_address.clone(),
        campaign_postal_code: info.campaign_postal_code.clone(),
        campaign_city: info.campaign_city.clone(),
        formatted_address: info.formatted_address.clone(),
        campaign_coordinates: info.campaign_coordinates,
        campaign_radius: info.campaign_radius,
        campaign_start_date: info.campaign_start_date,
        campaign_end_date: info.campaign_end_date,
        channel_meta: budget.channel_meta,
        channel_display: budget.channel_display,
        channel_pdooh: budget.channel_pdooh,
        budget_meta: budget.budget_meta,
        budget_display: budget.budget_display,
        budget_pdooh: budget.budget_pdooh,
        budget_meta_daily: draft.budget_meta_daily(),
        budget_display_daily: draft.budget_display_daily(),
        budget_pdooh_daily: draft.budget_pdooh_daily(),
        bidding_strategy: budget.bidding_strategy,
        max_cpm_display: budget.max_cpm_display,
        max_cpm_pdooh: budget.max_cpm_pdooh,
        active: info.active,
        bt_campaign_id: existing.and_then(|c| c.bt_campaign_id.clone()),
        // An eligible campaign is out of sync until the attempt right after
        // this save settles it.
        bt_sync_status: if sync_eligible {
            Some(SyncStatus::Pending)
        } else {
            existing.and_then(|c| c.bt_sync_status)
        },
        bt_sync_error: existing.and_then(|c| c.bt_sync_error.clone()),
        bt_last_sync: existing.and_then(|c| c.bt_last_sync),
        cr_ad_tags: existing.and_then(|c| c.cr_ad_tags.clone()),
        cr_last_updated: existing.and_then(|c| c.cr_last_updated),
        created_at: existing.map(|c| c.created_at).unwrap_or(now),
        updated_at: now,
    }
}

fn apply_sync_record(campaign: &mut Campaign, record: sync::SyncRecord) {
    campaign.bt_sync_status = Some(record.status);
    campaign.bt_sync_error = record.error;
    campaign.bt_last_sync = Some(record.at);
    if let Some(external_id) = record.external_id {
        campaign.bt_campaign_id = Some(external_id);
    }
}

async fn notify(
    notifier: &dyn Notifier,
    action: SaveAction,
    campaign: &Campaign,
    ctx: &RequestContext,
) {
    if let Err(err) = notifier.campaign_saved(action, campaign, &ctx.email).await {
        warn!("failed to send campaign notification: {}", err);
    }
}
