use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database as MongoDb};

use crate::error::Error;

use super::{User, UserId};

pub const USERS: &str = "users";

pub async fn initialize(db: &MongoDb) -> Result<(), Error> {
    db.run_command(
        doc! {
            "createIndexes": USERS,
            "indexes": [
                { "key": { "email": 1 }, "name": "email", "unique": true },
            ],
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), Error>;
    async fn fetch_users(&self) -> Result<Vec<User>, Error>;
    async fn fetch_user_by_id(&self, user_id: UserId) -> Result<Option<User>, Error>;
}

#[async_trait]
impl UserStore for Collection<User> {
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> Result<(), Error> {
        self.insert_one(user, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_users(&self) -> Result<Vec<User>, Error> {
        let users = self.find(doc! {}, None).await?.try_collect().await?;

        Ok(users)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_user_by_id(&self, user_id: UserId) -> Result<Option<User>, Error> {
        let user = self.find_one(doc! { "_id": user_id }, None).await?;

        Ok(user)
    }
}
