use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::delivery::template::{TemplateKind, TemplateVariables};
use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type CampaignId = TypedId<Campaign>;

/// A scheduled, time-boxed bulk-notification job. Deletion is a status
/// flag; records are never physically removed.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub id: CampaignId,
    pub name: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub window_start: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub window_stop: DateTime<Utc>,
    pub recipients: RecipientSet,
    pub template: TemplateKind,
    pub variables: TemplateVariables,
    pub status: CampaignStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub modified_at: DateTime<Utc>,
}

impl TypedIdMarker for Campaign {
    fn tag() -> &'static str {
        "CPN"
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum CampaignStatus {
    Scheduled,
    Running,
    Stopped,
    Deleted,
}

/// Who a campaign delivers to: an explicit address list captured at
/// creation, or the entire subscriber audience resolved at fire time.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "addresses", rename_all = "SCREAMING-KEBAB-CASE")]
pub enum RecipientSet {
    Explicit(Vec<String>),
    EntireAudience,
}

impl RecipientSet {
    pub fn is_empty(&self) -> bool {
        match self {
            RecipientSet::Explicit(addresses) => addresses.is_empty(),
            RecipientSet::EntireAudience => false,
        }
    }
}
