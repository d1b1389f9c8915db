use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database as MongoDb};

use crate::campaign::CampaignId;
use crate::error::Error;

use super::{AdCreative, CreativeId};

pub const AD_CREATIVES: &str = "ad_creatives";

pub async fn initialize(db: &MongoDb) -> Result<(), Error> {
    db.run_command(
        doc! {
            "createIndexes": AD_CREATIVES,
            "indexes": [
                { "key": { "campaign_id": 1, "apartment_key": 1 }, "name": "campaign_apartment" },
                { "key": { "target_id": 1 }, "name": "target_id" },
            ],
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait CreativeStore: Send + Sync {
    async fn insert_creatives(&self, creatives: &[AdCreative]) -> Result<(), Error>;
    async fn fetch_creatives(&self) -> Result<Vec<AdCreative>, Error>;
    async fn fetch_creatives_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<AdCreative>, Error>;
    async fn fetch_creatives_by_pair(
        &self,
        campaign_id: CampaignId,
        apartment_key: &str,
    ) -> Result<Vec<AdCreative>, Error>;
    async fn record_external_id(
        &self,
        creative_id: CreativeId,
        bt_creative_id: &str,
    ) -> Result<(), Error>;
}

#[async_trait]
impl CreativeStore for Collection<AdCreative> {
    #[tracing::instrument(skip(self, creatives), fields(count = creatives.len()))]
    async fn insert_creatives(&self, creatives: &[AdCreative]) -> Result<(), Error> {
        if !creatives.is_empty() {
            self.insert_many(creatives, None).await?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_creatives(&self) -> Result<Vec<AdCreative>, Error> {
        let creatives = self.find(doc! {}, None).await?.try_collect().await?;

        Ok(creatives)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_creatives_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<AdCreative>, Error> {
        let creatives = self
            .find(doc! { "campaign_id": campaign_id }, None)
            .await?
            .try_collect()
            .await?;

        Ok(creatives)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_creatives_by_pair(
        &self,
        campaign_id: CampaignId,
        apartment_key: &str,
    ) -> Result<Vec<AdCreative>, Error> {
        let creatives = self
            .find(
                doc! { "campaign_id": campaign_id, "apartment_key": apartment_key },
                None,
            )
            .await?
            .try_collect()
            .await?;

        Ok(creatives)
    }

    #[tracing::instrument(skip(self))]
    async fn record_external_id(
        &self,
        creative_id: CreativeId,
        bt_creative_id: &str,
    ) -> Result<(), Error> {
        self.update_one(
            doc! { "_id": creative_id },
            doc! { "$set": { "bt_creative_id": bt_creative_id } },
            None,
        )
        .await?;

        Ok(())
    }
}
