use mongodb::Collection;

use crate::audience::db::SubscriberStore;
use crate::audience::Subscriber;
use crate::campaign::db::CampaignStore;
use crate::campaign::Campaign;

pub type MongoCampaignStore = Collection<Campaign>;
pub type MongoSubscriberStore = Collection<Subscriber>;

pub trait Database: Send + Sync {
    fn campaigns(&self) -> &dyn CampaignStore;
    fn subscribers(&self) -> &dyn SubscriberStore;
}

#[derive(Clone, Debug)]
pub struct MongoDatabase {
    campaigns: Collection<Campaign>,
    subscribers: Collection<Subscriber>,
}

impl MongoDatabase {
    pub fn new(db: mongodb::Database) -> MongoDatabase {
        MongoDatabase {
            campaigns: db.collection("campaigns"),
            subscribers: db.collection("subscribers"),
        }
    }
}

impl Database for MongoDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        &self.campaigns
    }

    fn subscribers(&self) -> &dyn SubscriberStore {
        &self.subscribers
    }
}

#[cfg(test)]
pub mod test {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::campaign::{CampaignId, CampaignStatus};
    use crate::error::Error;

    use super::*;

    /// Closure-hook database double for manager tests: assign the hooks a
    /// test cares about, everything else panics on first use.
    pub struct MockDatabase {
        pub campaigns: MockCampaignStore,
        pub subscribers: MockSubscriberStore,
    }

    impl MockDatabase {
        pub fn new() -> MockDatabase {
            MockDatabase {
                campaigns: MockCampaignStore::new(),
                subscribers: MockSubscriberStore::new(),
            }
        }
    }

    impl Default for MockDatabase {
        fn default() -> MockDatabase {
            MockDatabase::new()
        }
    }

    impl Database for MockDatabase {
        fn campaigns(&self) -> &dyn CampaignStore {
            &self.campaigns
        }

        fn subscribers(&self) -> &dyn SubscriberStore {
            &self.subscribers
        }
    }

    pub struct MockCampaignStore {
        pub on_insert_campaign:
            Box<dyn Fn(&Campaign) -> Result<(), Error> + Send + Sync>,
        pub on_fetch_campaigns:
            Box<dyn Fn() -> Result<Vec<Campaign>, Error> + Send + Sync>,
        pub on_fetch_active_campaigns:
            Box<dyn Fn() -> Result<Vec<Campaign>, Error> + Send + Sync>,
        pub on_fetch_campaign_by_id:
            Box<dyn Fn(CampaignId) -> Result<Option<Campaign>, Error> + Send + Sync>,
        pub on_fetch_campaigns_by_status:
            Box<dyn Fn(&[CampaignStatus]) -> Result<Vec<Campaign>, Error> + Send + Sync>,
        pub on_update_campaign_status: Box<
            dyn Fn(&Campaign, CampaignStatus) -> Result<(), Error> + Send + Sync,
        >,
        pub on_update_campaign_window: Box<
            dyn Fn(&Campaign, DateTime<Utc>, DateTime<Utc>) -> Result<(), Error>
                + Send
                + Sync,
        >,
    }

    impl MockCampaignStore {
        pub fn new() -> MockCampaignStore {
            MockCampaignStore {
                on_insert_campaign: Box::new(|_| panic!("unexpected insert_campaign")),
                on_fetch_campaigns: Box::new(|| panic!("unexpected fetch_campaigns")),
                on_fetch_active_campaigns: Box::new(|| {
                    panic!("unexpected fetch_active_campaigns")
                }),
                on_fetch_campaign_by_id: Box::new(|_| {
                    panic!("unexpected fetch_campaign_by_id")
                }),
                on_fetch_campaigns_by_status: Box::new(|_| {
                    panic!("unexpected fetch_campaigns_by_status")
                }),
                on_update_campaign_status: Box::new(|_, _| {
                    panic!("unexpected update_campaign_status")
                }),
                on_update_campaign_window: Box::new(|_, _, _| {
                    panic!("unexpected update_campaign_window")
                }),
            }
        }
    }

    #[async_trait]
    impl CampaignStore for MockCampaignStore {
        async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
            (self.on_insert_campaign)(campaign)
        }

        async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
            (self.on_fetch_campaigns)()
        }

        async fn fetch_active_campaigns(&self) -> Result<Vec<Campaign>, Error> {
            (self.on_fetch_active_campaigns)()
        }

        async fn fetch_campaign_by_id(
            &self,
            campaign_id: CampaignId,
        ) -> Result<Option<Campaign>, Error> {
            (self.on_fetch_campaign_by_id)(campaign_id)
        }

        async fn fetch_campaigns_by_status(
            &self,
            statuses: &[CampaignStatus],
        ) -> Result<Vec<Campaign>, Error> {
            (self.on_fetch_campaigns_by_status)(statuses)
        }

        async fn update_campaign_status(
            &self,
            mut campaign: Campaign,
            status: CampaignStatus,
        ) -> Result<Campaign, Error> {
            (self.on_update_campaign_status)(&campaign, status)?;
            campaign.status = status;
            campaign.modified_at = Utc::now();
            Ok(campaign)
        }

        async fn update_campaign_window(
            &self,
            mut campaign: Campaign,
            window_start: DateTime<Utc>,
            window_stop: DateTime<Utc>,
        ) -> Result<Campaign, Error> {
            (self.on_update_campaign_window)(&campaign, window_start, window_stop)?;
            campaign.window_start = window_start;
            campaign.window_stop = window_stop;
            campaign.modified_at = Utc::now();
            Ok(campaign)
        }
    }

    pub struct MockSubscriberStore {
        pub on_fetch_subscribers:
            Box<dyn Fn() -> Result<Vec<Subscriber>, Error> + Send + Sync>,
        pub on_fetch_subscriber_by_email:
            Box<dyn Fn(&str) -> Result<Option<Subscriber>, Error> + Send + Sync>,
    }

    impl MockSubscriberStore {
        pub fn new() -> MockSubscriberStore {
            MockSubscriberStore {
                on_fetch_subscribers: Box::new(|| panic!("unexpected fetch_subscribers")),
                on_fetch_subscriber_by_email: Box::new(|_| {
                    panic!("unexpected fetch_subscriber_by_email")
                }),
            }
        }
    }

    #[async_trait]
    impl SubscriberStore for MockSubscriberStore {
        async fn fetch_subscribers(&self) -> Result<Vec<Subscriber>, Error> {
            (self.on_fetch_subscribers)()
        }

        async fn fetch_subscriber_by_email(
            &self,
            email: &str,
        ) -> Result<Option<Subscriber>, Error> {
            (self.on_fetch_subscriber_by_email)(email)
        }
    }
}
