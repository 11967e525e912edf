use std::sync::Arc;

use actix_web::web::{self, Data, JsonConfig, PathConfig, QueryConfig};
use actix_web::{App, HttpServer, ResponseError};
use mongodb::Client;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::fmt::format::FmtSpan;

mod audience;
mod campaign;
mod config;
mod database;
mod delivery;
mod error;
mod registry;
mod schedule;
mod typedid;

use config::Config;
use error::Error;

use crate::campaign::manager::CampaignManager;
use crate::database::{Database, MongoDatabase};
use crate::delivery::transport::HttpMailer;
use crate::registry::JobRegistry;

#[actix_web::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_span_events(FmtSpan::NEW)
        .compact()
        .init();

    let config = Config::load()?;

    info!("connecting to db: {}", config.mongo.uri);
    let db = Client::with_uri_str(&config.mongo.uri)
        .await?
        .database(&config.mongo.database);
    let db: Arc<dyn Database> = Arc::new(MongoDatabase::new(db));

    let registry = Arc::new(JobRegistry::new());
    let transport = Arc::new(HttpMailer::new(&config.mail)?);
    let manager = Data::new(CampaignManager::new(
        Arc::clone(&db),
        registry,
        transport,
        config.mail.clone(),
    ));

    // Timers died with the previous process; repair the records they left
    // behind before accepting requests.
    let repaired = manager.reconcile_on_startup().await?;
    if repaired > 0 {
        info!(repaired, "stale campaign records marked stopped");
    }

    let db = Data::from(db);
    info!("listening on {}", config.server.bind);
    HttpServer::new(move || {
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
            .app_data(db.clone())
            .app_data(manager.clone())
            .wrap(TracingLogger::default())
            .service(campaign::endpoints::create_campaign)
            .service(campaign::endpoints::get_campaigns)
            .service(campaign::endpoints::get_campaign_by_id)
            .service(campaign::endpoints::stop_campaign)
            .service(campaign::endpoints::reschedule_campaign)
            .service(campaign::endpoints::delete_campaign)
            .service(audience::endpoints::get_subscribers)
            .default_service(web::to(|| async { Error::PathNotFound.error_response() }))
    })
    .bind(&config.server.bind)?
    .run()
    .await?;

    Ok(())
}
