use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database as MongoDb};

use crate::error::Error;

use super::ActivityEntry;

pub const ACTIVITY_LOGS: &str = "activity_logs";

pub async fn initialize(db: &MongoDb) -> Result<(), Error> {
    db.run_command(
        doc! {
            "createIndexes": ACTIVITY_LOGS,
            "indexes": [
                { "key": { "created_at": -1 }, "name": "created_at" },
            ],
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), Error>;
    async fn fetch_recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>, Error>;
}

#[async_trait]
impl ActivityStore for Collection<ActivityEntry> {
    #[tracing::instrument(skip(self, entry), fields(action = %entry.action))]
    async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), Error> {
        self.insert_one(entry, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>, Error> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .build();

        let entries = self.find(doc! {}, options).await?.try_collect().await?;

        Ok(entries)
    }
}
