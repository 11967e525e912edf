use actix_web::get;
use actix_web::web::{Data, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database::Database;
use crate::error::Error;

use super::{manager, Subscriber, SubscriberId};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberBody {
    pub id: SubscriberId,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl From<Subscriber> for SubscriberBody {
    fn from(subscriber: Subscriber) -> SubscriberBody {
        SubscriberBody {
            id: subscriber.id,
            email: subscriber.email,
            created_at: subscriber.created_at,
            modified_at: subscriber.modified_at,
        }
    }
}

#[get("/subscribers")]
#[tracing::instrument(skip(db))]
async fn get_subscribers(db: Data<dyn Database>) -> Result<Json<Vec<SubscriberBody>>, Error> {
    let subscribers = manager::get_subscribers(db.get_ref()).await?;

    Ok(Json(subscribers.into_iter().map(Into::into).collect()))
}
