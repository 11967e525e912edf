use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson;

use crate::database::MongoCampaignStore;
use crate::error::Error;

use super::{Campaign, CampaignId, CampaignStatus};

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error>;

    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error>;

    /// Every campaign that has not been soft-deleted.
    async fn fetch_active_campaigns(&self) -> Result<Vec<Campaign>, Error>;

    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error>;

    async fn fetch_campaigns_by_status(
        &self,
        statuses: &[CampaignStatus],
    ) -> Result<Vec<Campaign>, Error>;

    async fn update_campaign_status(
        &self,
        campaign: Campaign,
        status: CampaignStatus,
    ) -> Result<Campaign, Error>;

    async fn update_campaign_window(
        &self,
        campaign: Campaign,
        window_start: DateTime<Utc>,
        window_stop: DateTime<Utc>,
    ) -> Result<Campaign, Error>;
}

#[async_trait]
impl CampaignStore for MongoCampaignStore {
    #[tracing::instrument(skip(self))]
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        self.insert_one(campaign, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let campaigns: Vec<Campaign> =
            self.find(bson::doc! {}, None).await?.try_collect().await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_active_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let deleted = bson::to_bson(&CampaignStatus::Deleted)?;
        let campaigns: Vec<Campaign> = self
            .find(bson::doc! { "status": { "$ne": deleted } }, None)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error> {
        let campaign: Option<Campaign> = self
            .find_one(bson::doc! { "_id": campaign_id }, None)
            .await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns_by_status(
        &self,
        statuses: &[CampaignStatus],
    ) -> Result<Vec<Campaign>, Error> {
        let statuses = statuses
            .iter()
            .map(bson::to_bson)
            .collect::<Result<Vec<_>, _>>()?;
        let campaigns: Vec<Campaign> = self
            .find(bson::doc! { "status": { "$in": statuses } }, None)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_status(
        &self,
        mut campaign: Campaign,
        status: CampaignStatus,
    ) -> Result<Campaign, Error> {
        let now = Utc::now();
        self.update_one(
            bson::doc! { "_id": campaign.id },
            bson::doc! { "$set": {
                "status": bson::to_bson(&status)?,
                "modified_at": bson::DateTime::from_chrono(now),
            } },
            None,
        )
        .await?;

        campaign.status = status;
        campaign.modified_at = now;
        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_window(
        &self,
        mut campaign: Campaign,
        window_start: DateTime<Utc>,
        window_stop: DateTime<Utc>,
    ) -> Result<Campaign, Error> {
        let now = Utc::now();
        self.update_one(
            bson::doc! { "_id": campaign.id },
            bson::doc! { "$set": {
                "window_start": bson::DateTime::from_chrono(window_start),
                "window_stop": bson::DateTime::from_chrono(window_stop),
                "modified_at": bson::DateTime::from_chrono(now),
            } },
            None,
        )
        .await?;

        campaign.window_start = window_start;
        campaign.window_stop = window_stop;
        campaign.modified_at = now;
        Ok(campaign)
    }
}
