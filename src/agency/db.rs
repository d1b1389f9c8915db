use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database as MongoDb};

use crate::error::Error;

use super::Agency;

pub const AGENCIES: &str = "agencies";

pub async fn initialize(_db: &MongoDb) -> Result<(), Error> {
    Ok(())
}

#[async_trait]
pub trait AgencyStore: Send + Sync {
    async fn insert_agency(&self, agency: &Agency) -> Result<(), Error>;
    async fn fetch_agencies(&self) -> Result<Vec<Agency>, Error>;
    async fn fetch_agency_by_id(&self, agency_id: &str) -> Result<Option<Agency>, Error>;
}

#[async_trait]
impl AgencyStore for Collection<Agency> {
    #[tracing::instrument(skip(self, agency), fields(agency_id = %agency.agency_id))]
    async fn insert_agency(&self, agency: &Agency) -> Result<(), Error> {
        self.insert_one(agency, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_agencies(&self) -> Result<Vec<Agency>, Error> {
        let agencies = self.find(doc! {}, None).await?.try_collect().await?;

        Ok(agencies)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_agency_by_id(&self, agency_id: &str) -> Result<Option<Agency>, Error> {
        let agency = self.find_one(doc! { "_id": agency_id }, None).await?;

        Ok(agency)
    }
}
