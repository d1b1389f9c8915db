//! Pushes campaigns to the ad server and records how the attempt went.
//! Local state is the source of truth: a failed push never rolls back what
//! the user saved, it only marks the campaign as out of sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bidtheatre::{
    AdFormat, AdServerApi, AdServerCampaign, AdServerStatus, ChannelAmounts, CreativeUploader,
    GeoTargeting, GeoUnit, Targeting,
};
use crate::creative::{self, render_embed_html};
use crate::database::Database;
use crate::error::Error;

use super::{Campaign, SyncStatus};

/// The recorded result of one sync attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncRecord {
    pub status: SyncStatus,
    pub external_id: Option<String>,
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

/// Expands a campaign into the ad-server payload. The same payload is used
/// for create, update and pause; only `status` varies.
pub fn build_adserver_campaign(campaign: &Campaign, creative_ids: Vec<String>) -> AdServerCampaign {
    let name = match campaign.campaign_end_date {
        Some(end) => format!(
            "{} - {} to {}",
            campaign.partner_name, campaign.campaign_start_date, end
        ),
        None => format!(
            "{} - {} to ongoing",
            campaign.partner_name, campaign.campaign_start_date
        ),
    };

    let mut ad_formats = Vec::new();
    if campaign.channel_display {
        ad_formats.push(AdFormat::Banner);
    }
    if campaign.channel_pdooh {
        ad_formats.push(AdFormat::Dooh);
    }

    let targeting = campaign
        .campaign_coordinates
        .filter(|coordinates| coordinates.is_set())
        .map(|coordinates| Targeting {
            geo: GeoTargeting {
                latitude: coordinates.lat,
                longitude: coordinates.lng,
                radius: campaign.campaign_radius,
                unit: GeoUnit::Meters,
            },
        });

    AdServerCampaign {
        name,
        advertiser_id: campaign.agency_id.clone(),
        start_date: campaign.campaign_start_date.first_day(),
        end_date: campaign.campaign_end_date.map(|end| end.last_day()),
        budgets: ChannelAmounts {
            display: campaign.budget_display.unwrap_or(0.0),
            pdooh: campaign.budget_pdooh.unwrap_or(0.0),
        },
        daily_budgets: ChannelAmounts {
            display: campaign.budget_display_daily,
            pdooh: campaign.budget_pdooh_daily,
        },
        ad_formats,
        creative_ids,
        targeting,
        bidding_strategy: campaign.bidding_strategy,
        bid_amounts: ChannelAmounts {
            display: campaign.max_cpm_display,
            pdooh: campaign.max_cpm_pdooh,
        },
        status: if campaign.active {
            AdServerStatus::Active
        } else {
            AdServerStatus::Paused
        },
    }
}

/// Runs one sync attempt and persists its outcome on the campaign. Returns
/// the recorded outcome; only the write of the outcome itself can fail.
#[tracing::instrument(skip(db, adserver, uploader, campaign), fields(campaign_id = %campaign.id))]
pub async fn sync_campaign(
    db: &dyn Database,
    adserver: &dyn AdServerApi,
    uploader: &dyn CreativeUploader,
    campaign: &Campaign,
) -> Result<SyncRecord, Error> {
    let record = match attempt_sync(db, adserver, uploader, campaign).await {
        Ok(external_id) => {
            info!("campaign synced to ad server");
            SyncRecord {
                status: SyncStatus::Synced,
                external_id,
                error: None,
                at: Utc::now(),
            }
        }
        Err(err) => {
            warn!("campaign sync failed: {}", err);
            SyncRecord {
                status: SyncStatus::Failed,
                external_id: None,
                error: Some(err.to_string()),
                at: Utc::now(),
            }
        }
    };

    db.campaigns().record_sync_outcome(campaign.id, &record).await?;

    Ok(record)
}

/// Creates or updates the ad-server campaign, depending on whether it has
/// been linked before. Returns the newly assigned external id on create.
async fn attempt_sync(
    db: &dyn Database,
    adserver: &dyn AdServerApi,
    uploader: &dyn CreativeUploader,
    campaign: &Campaign,
) -> Result<Option<String>, Error> {
    let creative_ids = resolve_creative_ids(db, uploader, campaign).await?;
    let payload = build_adserver_campaign(campaign, creative_ids);

    match &campaign.bt_campaign_id {
        Some(external_id) => {
            adserver.update_campaign(external_id, &payload).await?;
            Ok(None)
        }
        None => {
            let external_id = adserver.create_campaign(&payload).await?;
            Ok(Some(external_id))
        }
    }
}

/// Collects the ad-server creative ids for every linked apartment,
/// generating and uploading creatives that don't have one yet.
async fn resolve_creative_ids(
    db: &dyn Database,
    uploader: &dyn CreativeUploader,
    campaign: &Campaign,
) -> Result<Vec<String>, Error> {
    let links = db
        .campaign_apartments()
        .fetch_links_by_campaign(campaign.id)
        .await?;

    let mut creative_ids = Vec::new();
    let mut first_creative = None;
    let mut generated = false;

    for link in &links {
        let ensured =
            creative::manager::ensure_creatives(db, campaign, &link.apartment_key).await?;
        generated |= ensured.generated;

        for creative in ensured.creatives {
            let external_id = match &creative.bt_creative_id {
                Some(external_id) => external_id.clone(),
                None => {
                    let external_id = uploader.upload_creative(&creative).await?;
                    db.creatives()
                        .record_external_id(creative.id, &external_id)
                        .await?;
                    external_id
                }
            };
            creative_ids.push(external_id);

            if first_creative.is_none() {
                first_creative = Some(creative);
            }
        }
    }

    // Freshly generated creatives also refresh the embeddable ad tag shown
    // to operators.
    if generated {
        if let Some(creative) = &first_creative {
            db.campaigns()
                .record_ad_tags(campaign.id, &render_embed_html(creative), Utc::now())
                .await?;
        }
    }

    Ok(creative_ids)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::bidtheatre::test::{MockAdServer, MockUploader};
    use crate::campaign::test::{campaign, link};
    use crate::database::test::MockDatabase;

    use super::*;

    #[test]
    fn payload_expands_months_to_calendar_days() {
        let campaign = campaign();
        let payload = build_adserver_campaign(&campaign, vec![]);

        assert_eq!(payload.start_date.to_string(), "2024-03-01");
        assert_eq!(payload.end_date.unwrap().to_string(), "2024-03-31");
        assert_eq!(payload.name, "Kiinteistömaailma Töölö - 03/2024 to 03/2024");
        assert_eq!(payload.ad_formats, vec![AdFormat::Banner]);
        assert_eq!(payload.status, AdServerStatus::Active);
    }

    #[test]
    fn ongoing_campaign_has_no_end_date() {
        let campaign = Campaign {
            campaign_end_date: None,
            ..campaign()
        };
        let payload = build_adserver_campaign(&campaign, vec![]);

        assert!(payload.end_date.is_none());
        assert_eq!(payload.name, "Kiinteistömaailma Töölö - 03/2024 to ongoing");
    }

    #[test]
    fn unset_coordinates_produce_no_geo_targeting() {
        use crate::campaign::Coordinates;

        let campaign = Campaign {
            campaign_coordinates: Some(Coordinates { lat: 0.0, lng: 0.0 }),
            ..campaign()
        };
        assert!(build_adserver_campaign(&campaign, vec![]).targeting.is_none());

        let campaign = Campaign {
            campaign_coordinates: None,
            ..crate::campaign::test::campaign()
        };
        assert!(build_adserver_campaign(&campaign, vec![]).targeting.is_none());
    }

    #[test]
    fn inactive_campaign_is_pushed_as_paused() {
        let campaign = Campaign {
            active: false,
            ..campaign()
        };
        let payload = build_adserver_campaign(&campaign, vec![]);

        assert_eq!(payload.status, AdServerStatus::Paused);
    }

    #[tokio::test]
    async fn unlinked_campaign_is_created_and_linked() {
        let mut db = MockDatabase::new();
        let campaign = Campaign {
            channel_display: false,
            channel_pdooh: true,
            budget_display: None,
            budget_pdooh: Some(1500.0),
            budget_display_daily: 0.0,
            budget_pdooh_daily: 48.39,
            ..campaign()
        };

        let campaign_id = campaign.id;
        db.campaign_apartments.on_fetch_links_by_campaign =
            Box::new(move |id| Ok(vec![link(id, "APT-1")]));
        db.creatives.on_fetch_creatives_by_pair = Box::new(|_, _| Ok(vec![]));
        db.creatives.on_insert_creatives = Box::new(|_| Ok(()));
        db.creatives.on_record_external_id = Box::new(|_, _| Ok(()));
        db.campaigns.on_record_ad_tags = Box::new(|_, _| Ok(()));

        let recorded = Arc::new(Mutex::new(None));
        let recorded_clone = Arc::clone(&recorded);
        db.campaigns.on_record_sync_outcome = Box::new(move |id, record| {
            assert_eq!(id, campaign_id);
            *recorded_clone.lock().unwrap() = Some(record.clone());
            Ok(())
        });

        let adserver = MockAdServer {
            on_create_campaign: Box::new(|payload| {
                assert_eq!(payload.creative_ids.len(), 5);
                assert_eq!(payload.ad_formats, vec![AdFormat::Dooh]);
                assert_eq!(payload.daily_budgets.pdooh, 48.39);
                Ok("bt-campaign-1".to_string())
            }),
            ..MockAdServer::default()
        };
        let uploader = MockUploader::default();

        let record = sync_campaign(&db, &adserver, &uploader, &campaign)
            .await
            .unwrap();

        assert_eq!(record.status, SyncStatus::Synced);
        assert_eq!(record.external_id.as_deref(), Some("bt-campaign-1"));
        assert_eq!(record.error, None);

        let recorded = recorded.lock().unwrap();
        let recorded = recorded.as_ref().expect("outcome was not recorded");
        assert_eq!(recorded.status, SyncStatus::Synced);
        assert_eq!(recorded.external_id.as_deref(), Some("bt-campaign-1"));
    }

    #[tokio::test]
    async fn linked_campaign_is_updated_in_place() {
        let mut db = MockDatabase::new();
        let campaign = Campaign {
            bt_campaign_id: Some("bt-campaign-9".to_string()),
            ..campaign()
        };

        db.campaign_apartments.on_fetch_links_by_campaign = Box::new(|_| Ok(vec![]));
        db.campaigns.on_record_sync_outcome = Box::new(|_, record| {
            assert_eq!(record.status, SyncStatus::Synced);
            // an update keeps the existing link
            assert_eq!(record.external_id, None);
            Ok(())
        });

        let updated = Arc::new(Mutex::new(false));
        let updated_clone = Arc::clone(&updated);
        let adserver = MockAdServer {
            on_update_campaign: Box::new(move |external_id, _| {
                assert_eq!(external_id, "bt-campaign-9");
                *updated_clone.lock().unwrap() = true;
                Ok(())
            }),
            ..MockAdServer::default()
        };
        let uploader = MockUploader::default();

        sync_campaign(&db, &adserver, &uploader, &campaign)
            .await
            .unwrap();

        assert!(*updated.lock().unwrap(), "update_campaign was not called");
    }

    #[tokio::test]
    async fn failed_push_is_recorded_not_raised() {
        let mut db = MockDatabase::new();
        let campaign = campaign();

        db.campaign_apartments.on_fetch_links_by_campaign = Box::new(|_| Ok(vec![]));

        let recorded = Arc::new(Mutex::new(None));
        let recorded_clone = Arc::clone(&recorded);
        db.campaigns.on_record_sync_outcome = Box::new(move |_, record| {
            *recorded_clone.lock().unwrap() = Some(record.clone());
            Ok(())
        });

        let adserver = MockAdServer {
            on_create_campaign: Box::new(|_| {
                Err(Error::AdServerUnavailable("boom".to_string()))
            }),
            ..MockAdServer::default()
        };
        let uploader = MockUploader::default();

        let record = sync_campaign(&db, &adserver, &uploader, &campaign)
            .await
            .unwrap();

        assert_eq!(record.status, SyncStatus::Failed);
        assert_eq!(record.external_id, None);
        assert!(record.error.as_deref().unwrap().contains("boom"));

        // the failure timestamp still lands on the campaign
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.as_ref().unwrap().status, SyncStatus::Failed);
    }
}
