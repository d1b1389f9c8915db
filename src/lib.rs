use std::sync::Arc;
use std::time::Duration;

use actix_web::web::{self, Data, JsonConfig, PathConfig, QueryConfig};
use actix_web::{App, HttpServer, ResponseError};
use mongodb::Client;
use tracing::info;
use tracing_actix_web::TracingLogger;

pub mod activity;
pub mod agency;
pub mod apartment;
pub mod bidtheatre;
pub mod campaign;
pub mod config;
pub mod context;
pub mod creative;
pub mod database;
pub mod error;
pub mod notify;
pub mod reconcile;
pub mod seed;
pub mod typedid;
pub mod user;
pub mod violations;

use crate::apartment::feed::HttpApartmentFeed;
use crate::bidtheatre::{AdServerApi, CreativeUploader, HttpBidTheatre};
use crate::config::Config;
use crate::database::MongoDatabase;
use crate::error::Error;
use crate::notify::LogNotifier;
use crate::reconcile::AvailabilityMonitor;

pub async fn run(config: Config) -> Result<(), Error> {
    info!("connecting to db: {}", config.mongodb_uri);
    let db = Client::with_uri_str(&config.mongodb_uri)
        .await?
        .database(&config.mongodb_database);
    let db = MongoDatabase::initialize(db).await?;

    if config.seed_demo_data {
        info!("seeding demo data");
        seed::seed(&db).await?;
    }

    let adserver = Arc::new(HttpBidTheatre::new(
        config.adserver_api_url.clone(),
        config.adserver_network_id.clone(),
        config.adserver_username.clone(),
        config.adserver_password.clone(),
    ));
    let feed = Arc::new(HttpApartmentFeed::new(config.apartment_feed_url.clone()));
    let notifier = Data::new(LogNotifier);

    let monitor = Arc::new(AvailabilityMonitor::new(
        Arc::new(db.clone()),
        feed.clone(),
        adserver.clone() as Arc<dyn AdServerApi>,
        adserver.clone() as Arc<dyn CreativeUploader>,
        Duration::from_secs(config.reconcile_interval_secs),
    ));
    let monitor_handle = monitor.spawn();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(JsonConfig::default().error_handler(|err, _req| {
                // format json errors with custom format
                Error::InvalidJson(err).into()
            }))
            .app_data(PathConfig::default().error_handler(|err, _req| {
                // format path errors with custom format
                Error::InvalidPath(err).into()
            }))
            .app_data(QueryConfig::default().error_handler(|err, _req| {
                // format query errors with custom format
                Error::InvalidQuery(err).into()
            }))
            .app_data(Data::new(db.clone()))
            .app_data(Data::from(adserver.clone()))
            .app_data(Data::from(feed.clone()))
            .app_data(Data::from(monitor.clone()))
            .app_data(notifier.clone())
            .wrap(TracingLogger::default())
            .service(campaign::endpoints::create_campaign)
            .service(campaign::endpoints::update_campaign)
            .service(campaign::endpoints::get_campaigns)
            .service(campaign::endpoints::get_campaign_by_id)
            .service(campaign::endpoints::get_campaign_availability)
            .service(campaign::endpoints::get_campaign_adserver_state)
            .service(creative::endpoints::get_creatives)
            .service(creative::endpoints::get_creatives_by_campaign)
            .service(apartment::endpoints::get_apartments)
            .service(apartment::endpoints::get_contacts)
            .service(user::endpoints::create_user)
            .service(user::endpoints::get_users)
            .service(agency::endpoints::get_agencies)
            .service(activity::endpoints::get_activity)
            .default_service(web::to(|| async { Error::PathNotFound.error_response() }))
    })
    .bind(&config.listen_addr)?
    .run();

    info!("listening on {}", config.listen_addr);
    let result = server.await;

    monitor_handle.abort();
    result?;

    Ok(())
}
