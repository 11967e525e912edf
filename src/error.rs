use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::body::BoxBody;
use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use derivative::Derivative;
use mongodb::bson::ser::Error as BsonError;
use mongodb::error::Error as DatabaseError;
use serde::{Serialize, Serializer};

use crate::campaign::{CampaignId, CampaignStatus};

#[derive(Debug, Serialize, Derivative)]
#[derivative(PartialEq, Eq)]
#[serde(untagged)]
pub enum Error {
    // 400
    #[serde(serialize_with = "display")]
    InvalidJson(#[derivative(PartialEq = "ignore")] JsonPayloadError),
    #[serde(serialize_with = "display")]
    InvalidPath(#[derivative(PartialEq = "ignore")] PathError),
    #[serde(serialize_with = "display")]
    InvalidQuery(#[derivative(PartialEq = "ignore")] QueryPayloadError),
    WindowOutOfOrder {
        window_start: DateTime<Utc>,
        window_stop: DateTime<Utc>,
    },
    TemplateDoesNotExist {
        template_type: u8,
    },
    EmptyRecipientSet,
    RecipientsNotSubscribed {
        addresses: Vec<String>,
    },

    // 404
    PathNotFound,
    CampaignNotFound {
        campaign_id: CampaignId,
    },
    CampaignAlreadyDeleted {
        campaign_id: CampaignId,
    },

    // 409
    CampaignNotRunning {
        campaign_id: CampaignId,
        status: CampaignStatus,
    },
    CampaignNotStopped {
        campaign_id: CampaignId,
        status: CampaignStatus,
    },

    // 500
    RegistryOutOfSync {
        campaign_id: CampaignId,
        status: CampaignStatus,
        armed: bool,
    },
    #[serde(serialize_with = "display")]
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToBson(#[derivative(PartialEq = "ignore")] BsonError),
    #[serde(serialize_with = "display")]
    FailedMailTransport(#[derivative(PartialEq = "ignore")] reqwest::Error),
    #[serde(serialize_with = "display")]
    InvalidConfiguration(#[derivative(PartialEq = "ignore")] figment::Error),
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "E4001000",
            Error::InvalidPath(_) => "E4001001",
            Error::InvalidQuery(_) => "E4001002",
            Error::WindowOutOfOrder { .. } => "E4001003",
            Error::TemplateDoesNotExist { .. } => "E4001004",
            Error::EmptyRecipientSet => "E4001005",
            Error::RecipientsNotSubscribed { .. } => "E4001006",
            Error::PathNotFound => "E4041000",
            Error::CampaignNotFound { .. } => "E4041001",
            Error::CampaignAlreadyDeleted { .. } => "E4041002",
            Error::CampaignNotRunning { .. } => "E4091000",
            Error::CampaignNotStopped { .. } => "E4091001",
            Error::RegistryOutOfSync { .. } => "E5001000",
            Error::FailedDatabaseCall(_) => "E5001001",
            Error::FailedToSerializeToBson(_) => "E5001002",
            Error::FailedMailTransport(_) => "E5001003",
            Error::InvalidConfiguration(_) => "E5001004",
            Error::IoError(_) => "E5001005",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "The given json could not be parsed",
            Error::InvalidPath(_) => "The given path could not be parsed",
            Error::InvalidQuery(_) => "The given query could not be parsed",
            Error::WindowOutOfOrder { .. } => {
                "The delivery window must stop after it starts"
            }
            Error::TemplateDoesNotExist { .. } => "The requested template does not exist",
            Error::EmptyRecipientSet => {
                "The campaign has no stored recipients to deliver to"
            }
            Error::RecipientsNotSubscribed { .. } => {
                "One or more requested recipients are not subscribed"
            }
            Error::PathNotFound => "The requested path was not found",
            Error::CampaignNotFound { .. } => "The requested campaign was not found",
            Error::CampaignAlreadyDeleted { .. } => {
                "The requested campaign has been deleted"
            }
            Error::CampaignNotRunning { .. } => {
                "The requested campaign is not currently running"
            }
            Error::CampaignNotStopped { .. } => {
                "The requested campaign must be stopped before rescheduling"
            }
            Error::RegistryOutOfSync { .. } => {
                "The campaign record and the job registry disagree"
            }
            Error::FailedDatabaseCall(_) => {
                "An error occurred when communicating with the database"
            }
            Error::FailedToSerializeToBson(_) => {
                "An error occurred when serializing an object to bson"
            }
            Error::FailedMailTransport(_) => {
                "An error occurred when communicating with the mail transport"
            }
            Error::InvalidConfiguration(_) => "The server configuration could not be loaded",
            Error::IoError(_) => "An error occurred during an I/O operation",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Error::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Error::WindowOutOfOrder { .. } => StatusCode::BAD_REQUEST,
            Error::TemplateDoesNotExist { .. } => StatusCode::BAD_REQUEST,
            Error::EmptyRecipientSet => StatusCode::BAD_REQUEST,
            Error::RecipientsNotSubscribed { .. } => StatusCode::BAD_REQUEST,
            Error::PathNotFound => StatusCode::NOT_FOUND,
            Error::CampaignNotFound { .. } => StatusCode::NOT_FOUND,
            Error::CampaignAlreadyDeleted { .. } => StatusCode::NOT_FOUND,
            Error::CampaignNotRunning { .. } => StatusCode::CONFLICT,
            Error::CampaignNotStopped { .. } => StatusCode::CONFLICT,
            Error::RegistryOutOfSync { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToBson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedMailTransport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        #[derive(Serialize)]
        struct Dummy<'a> {
            error_code: &'static str,
            error_message: &'static str,
            error_meta: &'a Error,
        }

        HttpResponse::build(self.status_code()).json(&Dummy {
            error_code: self.error_code(),
            error_message: self.error_message(),
            error_meta: self,
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Error {
        Error::FailedDatabaseCall(error)
    }
}

impl From<BsonError> for Error {
    fn from(error: BsonError) -> Error {
        Error::FailedToSerializeToBson(error)
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Error {
        Error::FailedMailTransport(error)
    }
}

impl From<figment::Error> for Error {
    fn from(error: figment::Error) -> Error {
        Error::InvalidConfiguration(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::InvalidQuery(err) => Some(err),
            Error::FailedDatabaseCall(err) => Some(err),
            Error::FailedToSerializeToBson(err) => Some(err),
            Error::FailedMailTransport(err) => Some(err),
            Error::InvalidConfiguration(err) => Some(err),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

fn display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
