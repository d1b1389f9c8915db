//! Watches the apartment feed and pauses campaigns whose apartments have
//! left the market. Runs both on a timer and on demand from the campaign
//! detail endpoint; the two share an in-flight guard so one campaign is
//! never reconciled twice at once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::apartment::feed::ApartmentFeed;
use crate::apartment::Apartment;
use crate::bidtheatre::{AdServerApi, CreativeUploader};
use crate::campaign::{manager, Campaign, CampaignId};
use crate::database::Database;
use crate::error::Error;

/// What one reconciliation pass concluded for a campaign.
#[derive(Clone, Debug)]
pub struct ReconcileOutcome {
    pub sold_keys: Vec<String>,
    pub should_pause: bool,
}

/// Compares the campaign's linked apartment keys against the feed
/// snapshot. A key absent from the snapshot counts as sold. Pausing is
/// only warranted while the campaign is still active, which makes the
/// check idempotent: once paused, later passes conclude nothing.
pub fn reconcile(
    campaign_active: bool,
    linked_keys: &[String],
    snapshot: &[Apartment],
) -> ReconcileOutcome {
    let available: HashSet<&str> = snapshot
        .iter()
        .map(|apartment| apartment.key.as_str())
        .collect();

    let sold_keys: Vec<String> = linked_keys
        .iter()
        .filter(|key| !available.contains(key.as_str()))
        .cloned()
        .collect();

    let should_pause = !sold_keys.is_empty() && campaign_active;

    ReconcileOutcome {
        sold_keys,
        should_pause,
    }
}

/// Availability state reported for one campaign.
#[derive(Clone, Debug, Serialize)]
pub struct CampaignAvailability {
    pub campaign_id: CampaignId,
    pub sold_keys: Vec<String>,
    pub paused: bool,
    /// Set when another pass already held the campaign; nothing was
    /// checked or changed on this call.
    pub skipped: bool,
}

pub struct AvailabilityMonitor {
    db: Arc<dyn Database>,
    feed: Arc<dyn ApartmentFeed>,
    adserver: Arc<dyn AdServerApi>,
    uploader: Arc<dyn CreativeUploader>,
    interval: Duration,
    in_flight: Mutex<HashSet<CampaignId>>,
}

impl AvailabilityMonitor {
    pub fn new(
        db: Arc<dyn Database>,
        feed: Arc<dyn ApartmentFeed>,
        adserver: Arc<dyn AdServerApi>,
        uploader: Arc<dyn CreativeUploader>,
        interval: Duration,
    ) -> AvailabilityMonitor {
        AvailabilityMonitor {
            db,
            feed,
            adserver,
            uploader,
            interval,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Starts the periodic loop. The first pass runs immediately. The
    /// returned handle can be aborted at shutdown.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = monitor.run_pass().await {
                    // a dead feed means no information, not sold apartments
                    warn!("availability pass skipped: {}", err);
                }
            }
        })
    }

    /// One full pass over every active campaign against a single feed
    /// snapshot.
    #[instrument(skip(self))]
    pub async fn run_pass(&self) -> Result<(), Error> {
        let snapshot = self.feed.fetch_apartments().await?;
        let campaigns = self.db.campaigns().fetch_active_campaigns().await?;

        for campaign in campaigns {
            if let Err(err) = self.check_with_snapshot(&campaign, &snapshot).await {
                warn!(campaign_id = %campaign.id, "availability check failed: {}", err);
            }
        }

        Ok(())
    }

    /// On-demand check for one campaign, fetching a fresh snapshot. Feed
    /// errors surface to the caller here, unlike in the background loop.
    #[instrument(skip(self))]
    pub async fn check_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<CampaignAvailability, Error> {
        let campaign = self
            .db
            .campaigns()
            .fetch_campaign_by_id(campaign_id)
            .await?
            .ok_or(Error::CampaignNotFound { campaign_id })?;

        let snapshot = self.feed.fetch_apartments().await?;

        self.check_with_snapshot(&campaign, &snapshot).await
    }

    async fn check_with_snapshot(
        &self,
        campaign: &Campaign,
        snapshot: &[Apartment],
    ) -> Result<CampaignAvailability, Error> {
        let _guard = match self.begin(campaign.id) {
            Some(guard) => guard,
            None => {
                return Ok(CampaignAvailability {
                    campaign_id: campaign.id,
                    sold_keys: vec![],
                    paused: false,
                    skipped: true,
                })
            }
        };

        let links = self
            .db
            .campaign_apartments()
            .fetch_links_by_campaign(campaign.id)
            .await?;
        let linked_keys: Vec<String> = links
            .into_iter()
            .map(|link| link.apartment_key)
            .collect();

        let outcome = reconcile(campaign.active, &linked_keys, snapshot);

        if outcome.should_pause {
            info!(
                campaign_id = %campaign.id,
                sold = %outcome.sold_keys.join(", "),
                "apartments left the market, pausing campaign"
            );
            manager::pause_campaign(
                self.db.as_ref(),
                self.adserver.as_ref(),
                self.uploader.as_ref(),
                campaign,
                &outcome.sold_keys,
                manager::MONITOR_ACTOR,
            )
            .await?;
        }

        Ok(CampaignAvailability {
            campaign_id: campaign.id,
            sold_keys: outcome.sold_keys,
            paused: outcome.should_pause,
            skipped: false,
        })
    }

    fn begin(&self, campaign_id: CampaignId) -> Option<InFlightGuard<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(campaign_id) {
            return None;
        }
        Some(InFlightGuard {
            monitor: self,
            campaign_id,
        })
    }
}

struct InFlightGuard<'a> {
    monitor: &'a AvailabilityMonitor,
    campaign_id: CampaignId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .monitor
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.campaign_id);
    }
}

#[cfg(test)]
mod tests {
    use crate::apartment::feed::test::{apartment, MockFeed};
    use crate::bidtheatre::test::{MockAdServer, MockUploader};
    use crate::bidtheatre::AdServerStatus;
    use crate::campaign::test::{campaign, link};
    use crate::campaign::SyncStatus;
    use crate::database::test::MockDatabase;

    use super::*;

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|key| key.to_string()).collect()
    }

    #[test]
    fn keys_missing_from_the_snapshot_are_sold() {
        let snapshot = vec![apartment("APT-1"), apartment("APT-3")];
        let outcome = reconcile(true, &keys(&["APT-1", "APT-2"]), &snapshot);

        assert_eq!(outcome.sold_keys, vec!["APT-2".to_string()]);
        assert!(outcome.should_pause);
    }

    #[test]
    fn fully_available_campaign_is_left_alone() {
        let snapshot = vec![apartment("APT-1"), apartment("APT-2")];
        let outcome = reconcile(true, &keys(&["APT-1", "APT-2"]), &snapshot);

        assert!(outcome.sold_keys.is_empty());
        assert!(!outcome.should_pause);
    }

    #[test]
    fn paused_campaign_is_not_paused_again() {
        let snapshot = vec![apartment("APT-1")];

        // first pass pauses, second pass sees an inactive campaign
        let first = reconcile(true, &keys(&["APT-1", "APT-2"]), &snapshot);
        assert!(first.should_pause);

        let second = reconcile(false, &keys(&["APT-1", "APT-2"]), &snapshot);
        assert_eq!(second.sold_keys, first.sold_keys);
        assert!(!second.should_pause);
    }

    #[test]
    fn campaign_without_links_never_pauses() {
        let outcome = reconcile(true, &[], &[]);
        assert!(outcome.sold_keys.is_empty());
        assert!(!outcome.should_pause);
    }

    fn monitor_with(db: MockDatabase, feed: MockFeed, adserver: MockAdServer) -> AvailabilityMonitor {
        AvailabilityMonitor::new(
            Arc::new(db),
            Arc::new(feed),
            Arc::new(adserver),
            Arc::new(MockUploader::default()),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn sold_apartment_pauses_and_pushes_paused_status() {
        let mut db = MockDatabase::new();
        let active = Campaign {
            bt_campaign_id: Some("bt-campaign-3".to_string()),
            ..campaign()
        };
        let campaign_id = active.id;

        let fetched = active.clone();
        db.campaigns.on_fetch_active_campaigns = Box::new(move || Ok(vec![fetched.clone()]));
        db.campaign_apartments.on_fetch_links_by_campaign =
            Box::new(move |id| Ok(vec![link(id, "APT-1"), link(id, "APT-2")]));
        db.campaigns.on_set_campaign_active = Box::new(move |id, active| {
            assert_eq!(id, campaign_id);
            assert!(!active);
            Ok(())
        });
        db.campaigns.on_record_sync_outcome = Box::new(|_, record| {
            assert_eq!(record.status, SyncStatus::Synced);
            Ok(())
        });

        let feed = MockFeed::with_apartments(vec![apartment("APT-2")]);

        let adserver = MockAdServer {
            on_update_campaign: Box::new(|external_id, payload| {
                assert_eq!(external_id, "bt-campaign-3");
                assert_eq!(payload.status, AdServerStatus::Paused);
                Ok(())
            }),
            ..MockAdServer::default()
        };

        let monitor = monitor_with(db, feed, adserver);
        monitor.run_pass().await.unwrap();
    }

    #[tokio::test]
    async fn feed_outage_changes_nothing() {
        let mut db = MockDatabase::new();
        db.campaigns.on_fetch_active_campaigns =
            Box::new(|| panic!("campaigns must not be touched when the feed is down"));

        let feed = MockFeed {
            on_fetch_apartments: Box::new(|| {
                Err(Error::FeedUnavailable("connection refused".to_string()))
            }),
        };

        let monitor = monitor_with(db, feed, MockAdServer::default());
        let result = monitor.run_pass().await;

        assert!(matches!(result, Err(Error::FeedUnavailable(_))));
    }

    #[tokio::test]
    async fn overlapping_checks_are_skipped() {
        let mut db = MockDatabase::new();
        let active = campaign();
        let campaign_id = active.id;

        let fetched = active.clone();
        db.campaigns.on_fetch_campaign_by_id = Box::new(move |_| Ok(Some(fetched.clone())));

        let feed = MockFeed::with_apartments(vec![apartment("APT-1")]);
        let monitor = monitor_with(db, feed, MockAdServer::default());

        // simulate a pass already holding the campaign
        let guard = monitor.begin(campaign_id).unwrap();
        let availability = monitor.check_campaign(campaign_id).await.unwrap();
        assert!(availability.skipped);
        drop(guard);

        // released: the next check runs (no links, so nothing happens)
        let mut db = MockDatabase::new();
        let fetched = active.clone();
        db.campaigns.on_fetch_campaign_by_id = Box::new(move |_| Ok(Some(fetched.clone())));
        db.campaign_apartments.on_fetch_links_by_campaign = Box::new(|_| Ok(vec![]));
        let monitor = monitor_with(
            db,
            MockFeed::with_apartments(vec![apartment("APT-1")]),
            MockAdServer::default(),
        );
        let availability = monitor.check_campaign(campaign_id).await.unwrap();
        assert!(!availability.skipped);
        assert!(!availability.paused);
    }
}
