use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::audience;
use crate::config::MailConfig;
use crate::database::Database;
use crate::delivery;
use crate::delivery::template::{TemplateKind, TemplateVariables};
use crate::delivery::transport::MessageTransport;
use crate::error::Error;
use crate::registry::JobRegistry;
use crate::schedule;

use super::{Campaign, CampaignId, CampaignStatus, RecipientSet};

#[derive(Clone, Debug)]
pub struct CreateCampaign {
    pub name: String,
    pub window_start: DateTime<Utc>,
    pub window_stop: DateTime<Utc>,
    pub recipients: RecipientSet,
    pub template: TemplateKind,
    pub variables: TemplateVariables,
}

/// Orchestrates the campaign state machine: validates requests, arms and
/// disarms timer windows through the registry, and keeps the durable record
/// in step with what is armed.
///
/// Mutating operations for the same campaign id are serialized through a
/// per-id mutex; operations on different ids never contend. The record is
/// always written with `Scheduled` before a timer is armed and flipped to
/// `Running` only once the registry holds the window, so an armed job
/// without a durable record cannot exist.
pub struct CampaignManager {
    db: Arc<dyn Database>,
    registry: Arc<JobRegistry>,
    transport: Arc<dyn MessageTransport>,
    locks: DashMap<CampaignId, Arc<Mutex<()>>>,
    mail: MailConfig,
}

impl CampaignManager {
    pub fn new(
        db: Arc<dyn Database>,
        registry: Arc<JobRegistry>,
        transport: Arc<dyn MessageTransport>,
        mail: MailConfig,
    ) -> CampaignManager {
        CampaignManager {
            db,
            registry,
            transport,
            locks: DashMap::new(),
            mail,
        }
    }

    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateCampaign) -> Result<Campaign, Error> {
        if request.window_start >= request.window_stop {
            return Err(Error::WindowOutOfOrder {
                window_start: request.window_start,
                window_stop: request.window_stop,
            });
        }

        if let RecipientSet::Explicit(addresses) = &request.recipients {
            if addresses.is_empty() {
                return Err(Error::EmptyRecipientSet);
            }
            let missing =
                audience::manager::missing_subscriptions(self.db.as_ref(), addresses).await?;
            if !missing.is_empty() {
                return Err(Error::RecipientsNotSubscribed { addresses: missing });
            }
        }

        let start_pattern = schedule::translate(request.window_start);
        let stop_pattern = schedule::translate(request.window_stop);
        debug!(%start_pattern, %stop_pattern, "translated delivery window");

        let now = Utc::now();
        let campaign = Campaign {
            id: CampaignId::new(),
            name: request.name,
            window_start: request.window_start,
            window_stop: request.window_stop,
            recipients: request.recipients,
            template: request.template,
            variables: request.variables,
            status: CampaignStatus::Scheduled,
            created_at: now,
            modified_at: now,
        };

        let lock = self.entry_lock(campaign.id);
        let _guard = lock.lock().await;

        self.db.campaigns().insert_campaign(&campaign).await?;
        self.arm_window(&campaign);
        let campaign = self
            .db
            .campaigns()
            .update_campaign_status(campaign, CampaignStatus::Running)
            .await?;

        info!(campaign_id = %campaign.id, "campaign scheduled");
        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, campaign_id: CampaignId) -> Result<Campaign, Error> {
        let lock = self.entry_lock(campaign_id);
        let _guard = lock.lock().await;

        let campaign = self.fetch_live(campaign_id).await?;
        if campaign.status != CampaignStatus::Running {
            return Err(Error::CampaignNotRunning {
                campaign_id,
                status: campaign.status,
            });
        }

        if !self.registry.disarm(campaign_id) {
            let report = Error::RegistryOutOfSync {
                campaign_id,
                status: campaign.status,
                armed: false,
            };
            error!(%report, "record claimed a running job with nothing armed");
        }

        let campaign = self
            .db
            .campaigns()
            .update_campaign_status(campaign, CampaignStatus::Stopped)
            .await?;

        info!(campaign_id = %campaign.id, "campaign stopped");
        Ok(campaign)
    }

    /// Re-arm a stopped campaign against a new window. The recipient set is
    /// always the one captured at creation; a reschedule cannot change it.
    #[tracing::instrument(skip(self))]
    pub async fn reschedule(
        &self,
        campaign_id: CampaignId,
        window_start: DateTime<Utc>,
        window_stop: DateTime<Utc>,
    ) -> Result<Campaign, Error> {
        if window_start >= window_stop {
            return Err(Error::WindowOutOfOrder {
                window_start,
                window_stop,
            });
        }

        let lock = self.entry_lock(campaign_id);
        let _guard = lock.lock().await;

        let campaign = self.fetch_live(campaign_id).await?;
        if campaign.status != CampaignStatus::Stopped {
            return Err(Error::CampaignNotStopped {
                campaign_id,
                status: campaign.status,
            });
        }
        if campaign.recipients.is_empty() {
            return Err(Error::EmptyRecipientSet);
        }

        let start_pattern = schedule::translate(window_start);
        let stop_pattern = schedule::translate(window_stop);
        debug!(%start_pattern, %stop_pattern, "translated delivery window");

        let campaign = self
            .db
            .campaigns()
            .update_campaign_window(campaign, window_start, window_stop)
            .await?;
        let campaign = self
            .db
            .campaigns()
            .update_campaign_status(campaign, CampaignStatus::Scheduled)
            .await?;

        self.arm_window(&campaign);
        let campaign = self
            .db
            .campaigns()
            .update_campaign_status(campaign, CampaignStatus::Running)
            .await?;

        info!(campaign_id = %campaign.id, "campaign rescheduled");
        Ok(campaign)
    }

    /// Force stop semantics, then mark the record `Deleted`. Terminal: no
    /// later operation can revive the campaign.
    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, campaign_id: CampaignId) -> Result<Campaign, Error> {
        let lock = self.entry_lock(campaign_id);
        let _guard = lock.lock().await;

        let campaign = self.fetch_live(campaign_id).await?;
        self.registry.disarm(campaign_id);

        let campaign = self
            .db
            .campaigns()
            .update_campaign_status(campaign, CampaignStatus::Deleted)
            .await?;

        // Deleted is terminal, so the lock entry has no further use.
        self.locks.remove(&campaign_id);

        info!(campaign_id = %campaign.id, "campaign soft deleted");
        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, campaign_id: CampaignId) -> Result<Campaign, Error> {
        let campaign = self
            .db
            .campaigns()
            .fetch_campaign_by_id(campaign_id)
            .await?
            .ok_or(Error::CampaignNotFound { campaign_id })?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, active_only: bool) -> Result<Vec<Campaign>, Error> {
        let campaigns = if active_only {
            self.db.campaigns().fetch_active_campaigns().await?
        } else {
            self.db.campaigns().fetch_campaigns().await?
        };

        Ok(campaigns)
    }

    /// Timers do not survive a restart. Any record still claiming an armed
    /// window is repaired to `Stopped`, and the repair is reported.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile_on_startup(&self) -> Result<usize, Error> {
        let stale = self
            .db
            .campaigns()
            .fetch_campaigns_by_status(&[CampaignStatus::Scheduled, CampaignStatus::Running])
            .await?;

        let mut repaired = 0;
        for campaign in stale {
            if self.registry.is_armed(campaign.id) {
                continue;
            }
            let report = Error::RegistryOutOfSync {
                campaign_id: campaign.id,
                status: campaign.status,
                armed: false,
            };
            warn!(%report, "marking stale campaign stopped after restart");
            self.db
                .campaigns()
                .update_campaign_status(campaign, CampaignStatus::Stopped)
                .await?;
            repaired += 1;
        }

        Ok(repaired)
    }

    fn entry_lock(&self, campaign_id: CampaignId) -> Arc<Mutex<()>> {
        self.locks
            .entry(campaign_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn fetch_live(&self, campaign_id: CampaignId) -> Result<Campaign, Error> {
        let campaign = self
            .db
            .campaigns()
            .fetch_campaign_by_id(campaign_id)
            .await?
            .ok_or(Error::CampaignNotFound { campaign_id })?;

        if campaign.status == CampaignStatus::Deleted {
            return Err(Error::CampaignAlreadyDeleted { campaign_id });
        }

        Ok(campaign)
    }

    /// Arm the start/stop pair for `campaign`. The delivery callback
    /// resolves the recipient set and renders the template at fire time;
    /// the stop callback guarantees the record ends up `Stopped` whether or
    /// not delivery ever ran.
    fn arm_window(&self, campaign: &Campaign) {
        let campaign_id = campaign.id;

        let on_fire = {
            let db = Arc::clone(&self.db);
            let transport = Arc::clone(&self.transport);
            let recipients = campaign.recipients.clone();
            let template = campaign.template;
            let variables = campaign.variables.clone();
            let mail = self.mail.clone();
            async move {
                let addresses = match &recipients {
                    RecipientSet::Explicit(addresses) => addresses.clone(),
                    RecipientSet::EntireAudience => {
                        match audience::manager::resolve_all_addresses(db.as_ref()).await {
                            Ok(addresses) => addresses,
                            Err(err) => {
                                error!(campaign_id = %campaign_id, %err, "failed to resolve audience");
                                return;
                            }
                        }
                    }
                };

                let body = template.render(&variables);
                let outcome = delivery::deliver_campaign(
                    transport.as_ref(),
                    &mail.from,
                    &mail.subject,
                    &body,
                    addresses,
                    mail.concurrency,
                )
                .await;
                info!(
                    campaign_id = %campaign_id,
                    delivered = outcome.delivered,
                    failed = outcome.failed,
                    "campaign delivery finished"
                );
            }
        };

        // The callback re-fetches under the same per-id lock the manager
        // operations hold, so its read-check-write cannot interleave with a
        // concurrent stop or soft delete.
        let on_stop = {
            let db = Arc::clone(&self.db);
            let lock = self.entry_lock(campaign_id);
            async move {
                let _guard = lock.lock().await;
                if let Err(err) = finish_campaign(db.as_ref(), campaign_id).await {
                    error!(campaign_id = %campaign_id, %err, "failed to mark campaign stopped");
                }
            }
        };

        self.registry.arm(
            campaign_id,
            campaign.window_start,
            campaign.window_stop,
            on_fire,
            on_stop,
        );
    }
}

/// Stop-timer landing: mark the record `Stopped` unless it already reached
/// a state where that would be wrong. Idempotent with a manual stop and
/// with a start timer that fired and completed naturally.
async fn finish_campaign(db: &dyn Database, campaign_id: CampaignId) -> Result<(), Error> {
    let campaign = db
        .campaigns()
        .fetch_campaign_by_id(campaign_id)
        .await?
        .ok_or(Error::CampaignNotFound { campaign_id })?;

    match campaign.status {
        CampaignStatus::Stopped | CampaignStatus::Deleted => Ok(()),
        CampaignStatus::Scheduled | CampaignStatus::Running => {
            db.campaigns()
                .update_campaign_status(campaign, CampaignStatus::Stopped)
                .await?;
            Ok(())
        }
    }
}
