use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson;

use crate::database::MongoSubscriberStore;
use crate::error::Error;

use super::Subscriber;

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn fetch_subscribers(&self) -> Result<Vec<Subscriber>, Error>;

    async fn fetch_subscriber_by_email(&self, email: &str)
        -> Result<Option<Subscriber>, Error>;
}

#[async_trait]
impl SubscriberStore for MongoSubscriberStore {
    #[tracing::instrument(skip(self))]
    async fn fetch_subscribers(&self) -> Result<Vec<Subscriber>, Error> {
        let subscribers: Vec<Subscriber> =
            self.find(bson::doc! {}, None).await?.try_collect().await?;

        Ok(subscribers)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_subscriber_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Subscriber>, Error> {
        let subscriber: Option<Subscriber> =
            self.find_one(bson::doc! { "email": email }, None).await?;

        Ok(subscriber)
    }
}
