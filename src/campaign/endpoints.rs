use actix_web::web::{Data, Json, Path, Query};
use actix_web::{delete, get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::delivery::template::{TemplateKind, TemplateVariables};
use crate::error::Error;

use super::manager::{CampaignManager, CreateCampaign};
use super::{Campaign, CampaignId, CampaignStatus, RecipientSet};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignBody {
    pub id: CampaignId,
    pub name: String,
    pub window_start: DateTime<Utc>,
    pub window_stop: DateTime<Utc>,
    pub recipients: RecipientSet,
    pub template: TemplateKind,
    pub variables: TemplateVariables,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignBody {
    fn from(campaign: Campaign) -> CampaignBody {
        CampaignBody {
            id: campaign.id,
            name: campaign.name,
            window_start: campaign.window_start,
            window_stop: campaign.window_stop,
            recipients: campaign.recipients,
            template: campaign.template,
            variables: campaign.variables,
            status: campaign.status,
            created_at: campaign.created_at,
            modified_at: campaign.modified_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignBody {
    pub name: String,
    pub window_start: DateTime<Utc>,
    pub window_stop: DateTime<Utc>,
    pub recipients: RecipientSet,
    /// Historical 1-based template index.
    pub template_type: u8,
    pub variables: TemplateVariables,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleCampaignBody {
    pub window_start: DateTime<Utc>,
    pub window_stop: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCampaignsQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[post("/campaigns")]
#[tracing::instrument(skip(manager, body))]
async fn create_campaign(
    manager: Data<CampaignManager>,
    body: Json<CreateCampaignBody>,
) -> Result<Json<CampaignBody>, Error> {
    let body = body.into_inner();
    let template = TemplateKind::from_index(body.template_type)?;

    let campaign = manager
        .create(CreateCampaign {
            name: body.name,
            window_start: body.window_start,
            window_stop: body.window_stop,
            recipients: body.recipients,
            template,
            variables: body.variables,
        })
        .await?;

    Ok(Json(campaign.into()))
}

#[get("/campaigns")]
#[tracing::instrument(skip(manager))]
async fn get_campaigns(
    manager: Data<CampaignManager>,
    query: Query<ListCampaignsQuery>,
) -> Result<Json<Vec<CampaignBody>>, Error> {
    let campaigns = manager.list(query.active_only).await?;

    Ok(Json(campaigns.into_iter().map(Into::into).collect()))
}

#[get("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(manager))]
async fn get_campaign_by_id(
    manager: Data<CampaignManager>,
    path: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign = manager.get(path.into_inner()).await?;

    Ok(Json(campaign.into()))
}

#[post("/campaigns/{campaign_id}/stop")]
#[tracing::instrument(skip(manager))]
async fn stop_campaign(
    manager: Data<CampaignManager>,
    path: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign = manager.stop(path.into_inner()).await?;

    Ok(Json(campaign.into()))
}

#[post("/campaigns/{campaign_id}/reschedule")]
#[tracing::instrument(skip(manager, body))]
async fn reschedule_campaign(
    manager: Data<CampaignManager>,
    path: Path<CampaignId>,
    body: Json<RescheduleCampaignBody>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign = manager
        .reschedule(path.into_inner(), body.window_start, body.window_stop)
        .await?;

    Ok(Json(campaign.into()))
}

#[delete("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(manager))]
async fn delete_campaign(
    manager: Data<CampaignManager>,
    path: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign = manager.soft_delete(path.into_inner()).await?;

    Ok(Json(campaign.into()))
}
