use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derivative::Derivative;
use mongodb::bson::ser::Error as BsonError;
use mongodb::error::Error as DatabaseError;
use serde::{Serialize, Serializer};

use crate::campaign::CampaignId;
use crate::user::UserId;
use crate::violations::Violation;

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

    // 401
    MissingUserHeader,

    // 403
    AccessDenied,

    // 404
    PathNotFound,
    CampaignNotFound {
        campaign_id: CampaignId,
    },
    UserNotFound {
        user_id: UserId,
    },
    AgencyNotFound {
        agency_id: String,
    },

    // 409
    ConcurrentModificationDetected,
    CampaignViolatesRules {
        #[derivative(PartialEq = "ignore")]
        violations: Vec<Violation>,
    },
    CampaignNotLinkedToAdServer {
        campaign_id: CampaignId,
    },

    // 502
    FeedUnavailable(String),
    AdServerUnavailable(String),

    // 500
    ExistentialState(String),
    #[serde(serialize_with = "display")]
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToBson(#[derivative(PartialEq = "ignore")] BsonError),
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "E4001000",
            Error::InvalidPath(_) => "E4001001",
            Error::InvalidQuery(_) => "E4001002",
            Error::MissingUserHeader => "E4011000",
            Error::AccessDenied => "E4031000",
            Error::PathNotFound => "E4041000",
            Error::CampaignNotFound { .. } => "E4041001",
            Error::UserNotFound { .. } => "E4041002",
            Error::AgencyNotFound { .. } => "E4041003",
            Error::ConcurrentModificationDetected => "E4091000",
            Error::CampaignViolatesRules { .. } => "E4091001",
            Error::CampaignNotLinkedToAdServer { .. } => "E4091002",
            Error::FeedUnavailable(_) => "E5021000",
            Error::AdServerUnavailable(_) => "E5021001",
            Error::ExistentialState(_) => "E5001000",
            Error::FailedDatabaseCall(_) => "E5001001",
            Error::FailedToSerializeToBson(_) => "E5001002",
            Error::IoError(_) => "E5001003",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "The given json could not be parsed",
            Error::InvalidPath(_) => "The given path could not be parsed",
            Error::InvalidQuery(_) => "The given query could not be parsed",
            Error::MissingUserHeader => "The x-user-id header is missing or malformed",
            Error::AccessDenied => "The requesting user may not perform this operation",
            Error::PathNotFound => "The requested path was not found",
            Error::CampaignNotFound { .. } => "The requested campaign was not found",
            Error::UserNotFound { .. } => "The requested user was not found",
            Error::AgencyNotFound { .. } => "The requested agency was not found",
            Error::ConcurrentModificationDetected => {
                "The server detected a concurrent modification"
            }
            Error::CampaignViolatesRules { .. } => {
                "The submitted campaign violates the campaign rules"
            }
            Error::CampaignNotLinkedToAdServer { .. } => {
                "The requested campaign is not linked to an ad-server campaign"
            }
            Error::FeedUnavailable(_) => "The apartment feed could not be reached",
            Error::AdServerUnavailable(_) => "The ad server could not be reached",
            Error::ExistentialState(_) => "The server detected an invalid state",
            Error::FailedDatabaseCall(_) => {
                "An error occurred when communicating with the database"
            }
            Error::FailedToSerializeToBson(_) => {
                "An error occurred when serializing an object to bson"
            }
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
            Error::MissingUserHeader => StatusCode::UNAUTHORIZED,
            Error::AccessDenied => StatusCode::FORBIDDEN,
            Error::PathNotFound => StatusCode::NOT_FOUND,
            Error::CampaignNotFound { .. } => StatusCode::NOT_FOUND,
            Error::UserNotFound { .. } => StatusCode::NOT_FOUND,
            Error::AgencyNotFound { .. } => StatusCode::NOT_FOUND,
            Error::ConcurrentModificationDetected => StatusCode::CONFLICT,
            Error::CampaignViolatesRules { .. } => StatusCode::CONFLICT,
            Error::CampaignNotLinkedToAdServer { .. } => StatusCode::CONFLICT,
            Error::FeedUnavailable(_) => StatusCode::BAD_GATEWAY,
            Error::AdServerUnavailable(_) => StatusCode::BAD_GATEWAY,
            Error::ExistentialState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToBson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
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

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;

    use super::*;

    async fn envelope(error: Error) -> serde_json::Value {
        let response = error.error_response();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn response_body_carries_the_error_envelope() {
        let campaign_id: CampaignId = "CMP-D9D52B35-7681-4A7D-B709-C6AC9195CF2A"
            .parse()
            .unwrap();
        let error = Error::CampaignNotFound { campaign_id };
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);

        let body = envelope(error).await;
        assert_eq!(body["error_code"], "E4041001");
        assert_eq!(body["error_message"], "The requested campaign was not found");
        assert_eq!(
            body["error_meta"]["campaign_id"],
            "CMP-D9D52B35-7681-4A7D-B709-C6AC9195CF2A"
        );
    }

    #[tokio::test]
    async fn violations_are_listed_in_the_envelope_meta() {
        let error = Error::CampaignViolatesRules {
            violations: vec![Violation::NoChannelEnabled],
        };
        assert_eq!(error.status_code(), StatusCode::CONFLICT);

        let body = envelope(error).await;
        assert_eq!(body["error_code"], "E4091001");
        assert_eq!(body["error_meta"]["violations"][0]["type"], "NO-CHANNEL-ENABLED");
    }
}
