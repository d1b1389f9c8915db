use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::{Collection, Database as MongoDb};

use crate::error::Error;

use super::sync::SyncRecord;
use super::{Campaign, CampaignApartment, CampaignApartmentId, CampaignId};

pub const CAMPAIGNS: &str = "campaigns";
pub const CAMPAIGN_APARTMENTS: &str = "campaign_apartments";

pub async fn initialize(db: &MongoDb) -> Result<(), Error> {
    db.run_command(
        doc! {
            "createIndexes": CAMPAIGNS,
            "indexes": [
                { "key": { "agency_id": 1 }, "name": "agency_id" },
                { "key": { "active": 1 }, "name": "active" },
            ],
        },
        None,
    )
    .await?;

    db.run_command(
        doc! {
            "createIndexes": CAMPAIGN_APARTMENTS,
            "indexes": [
                { "key": { "campaign_id": 1 }, "name": "campaign_id" },
                { "key": { "apartment_key": 1 }, "name": "apartment_key" },
            ],
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error>;
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error>;
    async fn fetch_campaigns_by_agency(&self, agency_id: &str) -> Result<Vec<Campaign>, Error>;
    async fn fetch_active_campaigns(&self) -> Result<Vec<Campaign>, Error>;
    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error>;

    /// Replaces the stored campaign, but only if it still carries
    /// `expected_updated_at`; anything else means a concurrent writer won.
    async fn update_campaign(
        &self,
        campaign: &Campaign,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    async fn set_campaign_active(
        &self,
        campaign_id: CampaignId,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Writes the result of a sync attempt. Runs outside the optimistic
    /// locking scheme: the outcome of an attempt that happened is recorded
    /// no matter who else touched the campaign meanwhile.
    async fn record_sync_outcome(
        &self,
        campaign_id: CampaignId,
        record: &SyncRecord,
    ) -> Result<(), Error>;

    async fn record_ad_tags(
        &self,
        campaign_id: CampaignId,
        ad_tags: &str,
        at: DateTime<Utc>,
    ) -> Result<(), Error>;
}

#[async_trait]
impl CampaignStore for Collection<Campaign> {
    #[tracing::instrument(skip(self, campaign), fields(campaign_id = %campaign.id))]
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        self.insert_one(campaign, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let campaigns = self.find(doc! {}, None).await?.try_collect().await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns_by_agency(&self, agency_id: &str) -> Result<Vec<Campaign>, Error> {
        let campaigns = self
            .find(doc! { "agency_id": agency_id }, None)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_active_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let campaigns = self
            .find(doc! { "active": true }, None)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error> {
        let campaign = self.find_one(doc! { "_id": campaign_id }, None).await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self, campaign), fields(campaign_id = %campaign.id))]
    async fn update_campaign(
        &self,
        campaign: &Campaign,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let result = self
            .replace_one(
                doc! {
                    "_id": campaign.id,
                    "updated_at": bson::DateTime::from_chrono(expected_updated_at),
                },
                campaign,
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::ConcurrentModificationDetected);
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn set_campaign_active(
        &self,
        campaign_id: CampaignId,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.update_one(
            doc! { "_id": campaign_id },
            doc! { "$set": {
                "active": active,
                "updated_at": bson::DateTime::from_chrono(at),
            } },
            None,
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, record), fields(status = ?record.status))]
    async fn record_sync_outcome(
        &self,
        campaign_id: CampaignId,
        record: &SyncRecord,
    ) -> Result<(), Error> {
        let mut fields = doc! {
            "bt_sync_status": bson::to_bson(&record.status)?,
            "bt_sync_error": bson::to_bson(&record.error)?,
            "bt_last_sync": bson::to_bson(&record.at)?,
        };
        // A failed create has no external id yet; never erase one that a
        // previous attempt established.
        if let Some(external_id) = &record.external_id {
            fields.insert("bt_campaign_id", external_id);
        }

        self.update_one(doc! { "_id": campaign_id }, doc! { "$set": fields }, None)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, ad_tags))]
    async fn record_ad_tags(
        &self,
        campaign_id: CampaignId,
        ad_tags: &str,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.update_one(
            doc! { "_id": campaign_id },
            doc! { "$set": {
                "cr_ad_tags": ad_tags,
                "cr_last_updated": bson::to_bson(&at)?,
            } },
            None,
        )
        .await?;

        Ok(())
    }
}

#[async_trait]
pub trait CampaignApartmentStore: Send + Sync {
    /// Replaces the campaign's linked apartments with the given set. The
    /// link rows are wholly owned by their campaign, so a full swap keeps
    /// them consistent with the submitted selection.
    async fn replace_links(
        &self,
        campaign_id: CampaignId,
        apartment_keys: &[String],
        at: DateTime<Utc>,
    ) -> Result<Vec<CampaignApartment>, Error>;

    async fn fetch_links_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<CampaignApartment>, Error>;
}

#[async_trait]
impl CampaignApartmentStore for Collection<CampaignApartment> {
    #[tracing::instrument(skip(self, apartment_keys))]
    async fn replace_links(
        &self,
        campaign_id: CampaignId,
        apartment_keys: &[String],
        at: DateTime<Utc>,
    ) -> Result<Vec<CampaignApartment>, Error> {
        self.delete_many(doc! { "campaign_id": campaign_id }, None)
            .await?;

        let links: Vec<CampaignApartment> = apartment_keys
            .iter()
            .map(|key| CampaignApartment {
                id: CampaignApartmentId::new(),
                campaign_id,
                apartment_key: key.clone(),
                active: true,
                created_at: at,
                updated_at: at,
            })
            .collect();

        if !links.is_empty() {
            self.insert_many(&links, None).await?;
        }

        Ok(links)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_links_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<CampaignApartment>, Error> {
        let links = self
            .find(doc! { "campaign_id": campaign_id }, None)
            .await?
            .try_collect()
            .await?;

        Ok(links)
    }
}
