use async_trait::async_trait;
use tracing::instrument;

use crate::error::Error;

use super::Apartment;

/// Read access to the external availability feed.
#[async_trait]
pub trait ApartmentFeed: Send + Sync {
    /// Fetches the current snapshot of every listing on the market.
    async fn fetch_apartments(&self) -> Result<Vec<Apartment>, Error>;
}

#[derive(Clone, Debug)]
pub struct HttpApartmentFeed {
    url: String,
    client: reqwest::Client,
}

impl HttpApartmentFeed {
    pub fn new(url: String) -> HttpApartmentFeed {
        HttpApartmentFeed {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ApartmentFeed for HttpApartmentFeed {
    #[instrument(skip(self))]
    async fn fetch_apartments(&self) -> Result<Vec<Apartment>, Error> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| Error::FeedUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::FeedUnavailable(format!(
                "feed returned status {}",
                response.status()
            )));
        }

        let apartments = response
            .json()
            .await
            .map_err(|err| Error::FeedUnavailable(err.to_string()))?;

        Ok(apartments)
    }
}
