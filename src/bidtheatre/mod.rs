//! Client for the BidTheatre ad server. Campaign pushes and creative
//! uploads go through the [`AdServerApi`] and [`CreativeUploader`] seams so
//! the sync pipeline can be exercised without the network.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::campaign::BiddingStrategy;
use crate::creative::{render_embed_html, AdCreative};
use crate::error::Error;

/// The campaign payload pushed to the ad server, identical for create and
/// update so a pause can re-send the whole campaign with a new status.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdServerCampaign {
    pub name: String,
    pub advertiser_id: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub budgets: ChannelAmounts,
    pub daily_budgets: ChannelAmounts,
    pub ad_formats: Vec<AdFormat>,
    pub creative_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeting: Option<Targeting>,
    pub bidding_strategy: BiddingStrategy,
    pub bid_amounts: ChannelAmounts,
    pub status: AdServerStatus,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ChannelAmounts {
    pub display: f64,
    pub pdooh: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdFormat {
    Banner,
    Dooh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdServerStatus {
    Active,
    Paused,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Targeting {
    pub geo: GeoTargeting,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GeoTargeting {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: u32,
    pub unit: GeoUnit,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoUnit {
    Meters,
}

/// What the ad server reports back about a linked campaign. The upstream
/// shape is loosely specified, so every field is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdServerCampaignDetails {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budgets: Option<ChannelAmounts>,
    pub daily_budgets: Option<ChannelAmounts>,
}

#[async_trait]
pub trait AdServerApi: Send + Sync {
    /// Creates the campaign and returns the ad server's id for it.
    async fn create_campaign(&self, campaign: &AdServerCampaign) -> Result<String, Error>;
    async fn update_campaign(
        &self,
        external_id: &str,
        campaign: &AdServerCampaign,
    ) -> Result<(), Error>;
    async fn get_campaign(&self, external_id: &str) -> Result<AdServerCampaignDetails, Error>;
}

#[async_trait]
pub trait CreativeUploader: Send + Sync {
    /// Uploads one creative and returns the ad server's id for it.
    async fn upload_creative(&self, creative: &AdCreative) -> Result<String, Error>;
}

const TOKEN_TTL_MINUTES: i64 = 10;
const TOKEN_REFRESH_MARGIN_SECONDS: i64 = 30;

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

pub struct HttpBidTheatre {
    api_url: String,
    network_id: String,
    username: String,
    password: String,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl HttpBidTheatre {
    pub fn new(
        api_url: String,
        network_id: String,
        username: String,
        password: String,
    ) -> HttpBidTheatre {
        HttpBidTheatre {
            api_url,
            network_id,
            username,
            password,
            client: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    /// Returns a cached bearer token, re-authenticating shortly before the
    /// previous one expires.
    async fn bearer_token(&self) -> Result<String, Error> {
        let mut cached = self.token.lock().await;

        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECONDS);
        if let Some(token) = cached.as_ref() {
            if Utc::now() + margin < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        debug!("requesting new ad-server token");

        #[derive(Serialize)]
        struct AuthRequest<'a> {
            username: &'a str,
            password: &'a str,
        }

        #[derive(Deserialize)]
        struct AuthResponse {
            token: Option<String>,
        }

        let response = self
            .client
            .post(format!("{}/auth", self.api_url))
            .json(&AuthRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|err| Error::AdServerUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::AdServerUnavailable(format!(
                "authentication returned status {}",
                response.status()
            )));
        }

        let body: AuthResponse = response
            .json()
            .await
            .map_err(|err| Error::AdServerUnavailable(err.to_string()))?;

        let token = body.token.ok_or_else(|| {
            Error::AdServerUnavailable("authentication response had no token".to_string())
        })?;

        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES),
        });

        Ok(token)
    }

    fn campaign_url(&self) -> String {
        format!("{}/{}/campaign", self.api_url, self.network_id)
    }

    fn creative_url(&self) -> String {
        format!("{}/{}/creative", self.api_url, self.network_id)
    }
}

#[async_trait]
impl AdServerApi for HttpBidTheatre {
    #[instrument(skip(self, campaign), fields(name = %campaign.name))]
    async fn create_campaign(&self, campaign: &AdServerCampaign) -> Result<String, Error> {
        let token = self.bearer_token().await?;

        #[derive(Deserialize)]
        struct CreateResponse {
            id: Option<String>,
        }

        let response = self
            .client
            .post(self.campaign_url())
            .bearer_auth(token)
            .json(campaign)
            .send()
            .await
            .map_err(|err| Error::AdServerUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::AdServerUnavailable(format!(
                "campaign create returned status {}",
                response.status()
            )));
        }

        let body: CreateResponse = response
            .json()
            .await
            .map_err(|err| Error::AdServerUnavailable(err.to_string()))?;

        body.id.ok_or_else(|| {
            Error::AdServerUnavailable("campaign create response had no id".to_string())
        })
    }

    #[instrument(skip(self, campaign))]
    async fn update_campaign(
        &self,
        external_id: &str,
        campaign: &AdServerCampaign,
    ) -> Result<(), Error> {
        let token = self.bearer_token().await?;

        let response = self
            .client
            .put(format!("{}/{}", self.campaign_url(), external_id))
            .bearer_auth(token)
            .json(campaign)
            .send()
            .await
            .map_err(|err| Error::AdServerUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::AdServerUnavailable(format!(
                "campaign update returned status {}",
                response.status()
            )));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_campaign(&self, external_id: &str) -> Result<AdServerCampaignDetails, Error> {
        let token = self.bearer_token().await?;

        let response = self
            .client
            .get(format!("{}/{}", self.campaign_url(), external_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| Error::AdServerUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::AdServerUnavailable(format!(
                "campaign fetch returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|err| Error::AdServerUnavailable(err.to_string()))
    }
}

#[async_trait]
impl CreativeUploader for HttpBidTheatre {
    #[instrument(skip(self, creative), fields(name = %creative.name))]
    async fn upload_creative(&self, creative: &AdCreative) -> Result<String, Error> {
        let token = self.bearer_token().await?;

        #[derive(Serialize)]
        struct UploadRequest<'a> {
            name: &'a str,
            width: u32,
            height: u32,
            html: String,
        }

        #[derive(Deserialize)]
        struct UploadResponse {
            id: Option<String>,
        }

        let response = self
            .client
            .post(self.creative_url())
            .bearer_auth(token)
            .json(&UploadRequest {
                name: &creative.name,
                width: creative.width,
                height: creative.height,
                html: render_embed_html(creative),
            })
            .send()
            .await
            .map_err(|err| Error::AdServerUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::AdServerUnavailable(format!(
                "creative upload returned status {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|err| Error::AdServerUnavailable(err.to_string()))?;

        body.id.ok_or_else(|| {
            Error::AdServerUnavailable("creative upload response had no id".to_string())
        })
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    pub struct MockAdServer {
        pub on_create_campaign:
            Box<dyn Fn(&AdServerCampaign) -> Result<String, Error> + Send + Sync>,
        pub on_update_campaign:
            Box<dyn Fn(&str, &AdServerCampaign) -> Result<(), Error> + Send + Sync>,
        pub on_get_campaign:
            Box<dyn Fn(&str) -> Result<AdServerCampaignDetails, Error> + Send + Sync>,
    }

    impl Default for MockAdServer {
        fn default() -> MockAdServer {
            MockAdServer {
                on_create_campaign: Box::new(|_| panic!("unexpected campaign create")),
                on_update_campaign: Box::new(|_, _| panic!("unexpected campaign update")),
                on_get_campaign: Box::new(|_| panic!("unexpected campaign fetch")),
            }
        }
    }

    #[async_trait]
    impl AdServerApi for MockAdServer {
        async fn create_campaign(&self, campaign: &AdServerCampaign) -> Result<String, Error> {
            (self.on_create_campaign)(campaign)
        }

        async fn update_campaign(
            &self,
            external_id: &str,
            campaign: &AdServerCampaign,
        ) -> Result<(), Error> {
            (self.on_update_campaign)(external_id, campaign)
        }

        async fn get_campaign(
            &self,
            external_id: &str,
        ) -> Result<AdServerCampaignDetails, Error> {
            (self.on_get_campaign)(external_id)
        }
    }

    pub struct MockUploader {
        pub on_upload_creative: Box<dyn Fn(&AdCreative) -> Result<String, Error> + Send + Sync>,
    }

    impl Default for MockUploader {
        fn default() -> MockUploader {
            MockUploader {
                on_upload_creative: Box::new(|creative| Ok(format!("bt-{}", creative.size))),
            }
        }
    }

    #[async_trait]
    impl CreativeUploader for MockUploader {
        async fn upload_creative(&self, creative: &AdCreative) -> Result<String, Error> {
            (self.on_upload_creative)(creative)
        }
    }
}
