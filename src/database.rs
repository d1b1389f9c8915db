use mongodb::{Collection, Database as MongoDb};

use crate::activity::db::ActivityStore;
use crate::activity::ActivityEntry;
use crate::agency::db::AgencyStore;
use crate::agency::Agency;
use crate::campaign::db::{CampaignApartmentStore, CampaignStore};
use crate::campaign::{Campaign, CampaignApartment};
use crate::creative::db::CreativeStore;
use crate::creative::AdCreative;
use crate::error::Error;
use crate::user::db::UserStore;
use crate::user::User;
use crate::{activity, agency, campaign, creative, user};

/// Storage access for the managers, one store per collection. Production
/// uses [`MongoDatabase`]; tests swap in [`test::MockDatabase`].
pub trait Database: Send + Sync {
    fn campaigns(&self) -> &dyn CampaignStore;
    fn campaign_apartments(&self) -> &dyn CampaignApartmentStore;
    fn creatives(&self) -> &dyn CreativeStore;
    fn users(&self) -> &dyn UserStore;
    fn agencies(&self) -> &dyn AgencyStore;
    fn activity(&self) -> &dyn ActivityStore;
}

#[derive(Debug, Clone)]
pub struct MongoDatabase {
    campaigns: Collection<Campaign>,
    campaign_apartments: Collection<CampaignApartment>,
    creatives: Collection<AdCreative>,
    users: Collection<User>,
    agencies: Collection<Agency>,
    activity: Collection<ActivityEntry>,
    db: MongoDb,
}

impl MongoDatabase {
    pub async fn initialize(db: MongoDb) -> Result<MongoDatabase, Error> {
        campaign::db::initialize(&db).await?;
        creative::db::initialize(&db).await?;
        user::db::initialize(&db).await?;
        agency::db::initialize(&db).await?;
        activity::db::initialize(&db).await?;

        Ok(MongoDatabase::new(db))
    }

    pub fn new(db: MongoDb) -> MongoDatabase {
        MongoDatabase {
            campaigns: db.collection(campaign::db::CAMPAIGNS),
            campaign_apartments: db.collection(campaign::db::CAMPAIGN_APARTMENTS),
            creatives: db.collection(creative::db::AD_CREATIVES),
            users: db.collection(user::db::USERS),
            agencies: db.collection(agency::db::AGENCIES),
            activity: db.collection(activity::db::ACTIVITY_LOGS),
            db,
        }
    }

    pub async fn drop(&self) -> Result<(), Error> {
        self.db.drop(None).await?;
        Ok(())
    }
}

impl Database for MongoDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        &self.campaigns
    }

    fn campaign_apartments(&self) -> &dyn CampaignApartmentStore {
        &self.campaign_apartments
    }

    fn creatives(&self) -> &dyn CreativeStore {
        &self.creatives
    }

    fn users(&self) -> &dyn UserStore {
        &self.users
    }

    fn agencies(&self) -> &dyn AgencyStore {
        &self.agencies
    }

    fn activity(&self) -> &dyn ActivityStore {
        &self.activity
    }
}
