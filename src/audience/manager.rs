use crate::database::Database;
use crate::error::Error;

use super::Subscriber;

#[tracing::instrument(skip(db))]
pub async fn get_subscribers(db: &dyn Database) -> Result<Vec<Subscriber>, Error> {
    let subscribers = db.subscribers().fetch_subscribers().await?;

    Ok(subscribers)
}

/// The full audience as a flat address list, in store order.
#[tracing::instrument(skip(db))]
pub async fn resolve_all_addresses(db: &dyn Database) -> Result<Vec<String>, Error> {
    let subscribers = db.subscribers().fetch_subscribers().await?;

    Ok(subscribers
        .into_iter()
        .map(|subscriber| subscriber.email)
        .collect())
}

/// Which of `addresses` have no matching subscriber.
#[tracing::instrument(skip(db, addresses))]
pub async fn missing_subscriptions(
    db: &dyn Database,
    addresses: &[String],
) -> Result<Vec<String>, Error> {
    let mut missing = Vec::new();
    for address in addresses {
        if db
            .subscribers()
            .fetch_subscriber_by_email(address)
            .await?
            .is_none()
        {
            missing.push(address.clone());
        }
    }

    Ok(missing)
}
