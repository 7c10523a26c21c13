//! RFC7807 ("problem+json") HTTP error plumbing and the typed error enums for
//! each of the engine's internal seams. Structure and naming are carried over
//! from `interledger-errors`, trimmed down to the error catalog this engine
//! actually needs.

use chrono::{DateTime, Local};
use http::header::HeaderValue;
use serde::{ser::Serializer, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Display};
use thiserror::Error;
use warp::{reject::Reject, reply::json, reply::Response, Rejection, Reply};

const ERROR_TYPE_PREFIX: &str = "https://errors.interledger.org/http-api";

/// Distinguishes RFC7807's generic `about:blank` type from an engine-specific one.
#[derive(Clone, Copy, Debug)]
pub enum ProblemType {
    Default,
    SettlementEngine(&'static str),
}

/// A canned `(type, title, status)` triple used to build an [`ApiError`].
#[derive(Clone, Copy, Debug)]
pub struct ApiErrorType {
    pub r#type: &'static ProblemType,
    pub title: &'static str,
    pub status: http::StatusCode,
}

pub static DEFAULT_INTERNAL_SERVER_ERROR_TYPE: ApiErrorType = ApiErrorType {
    r#type: &ProblemType::Default,
    title: "Internal Server Error",
    status: http::StatusCode::INTERNAL_SERVER_ERROR,
};

pub static DEFAULT_NOT_FOUND_TYPE: ApiErrorType = ApiErrorType {
    r#type: &ProblemType::Default,
    title: "Not Found",
    status: http::StatusCode::NOT_FOUND,
};

pub static DEFAULT_BAD_REQUEST_TYPE: ApiErrorType = ApiErrorType {
    r#type: &ProblemType::Default,
    title: "Bad Request",
    status: http::StatusCode::BAD_REQUEST,
};

pub static PEER_NOT_FOUND_TYPE: ApiErrorType = ApiErrorType {
    r#type: &ProblemType::SettlementEngine("peer-identity-not-established"),
    title: "Peer ledger account is not yet known; the account-setup handshake has not completed",
    status: http::StatusCode::INTERNAL_SERVER_ERROR,
};

/// RFC7807 problem-details object. Implements [`warp::Reply`] so handlers can
/// return it directly, and [`warp::reject::Reject`] so it can be attached to
/// a `Rejection` and recovered uniformly by [`default_rejection_handler`].
#[derive(Clone, Debug, Serialize)]
pub struct ApiError {
    #[serde(serialize_with = "serialize_type")]
    pub r#type: &'static ProblemType,
    pub title: &'static str,
    #[serde(serialize_with = "serialize_status_code")]
    pub status: http::StatusCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn serialize_status_code<S>(status: &http::StatusCode, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_u16(status.as_u16())
}

fn serialize_type<S>(r#type: &ProblemType, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match r#type {
        ProblemType::Default => s.serialize_str("about:blank"),
        ProblemType::SettlementEngine(path) => {
            s.serialize_str(&format!("{}/{}", ERROR_TYPE_PREFIX, path))
        }
    }
}

impl ApiError {
    pub fn from_api_error_type(problem_type: &ApiErrorType) -> Self {
        ApiError {
            r#type: problem_type.r#type,
            title: problem_type.title,
            status: problem_type.status,
            detail: None,
        }
    }

    pub fn internal_server_error() -> Self {
        ApiError::from_api_error_type(&DEFAULT_INTERNAL_SERVER_ERROR_TYPE)
    }

    pub fn not_found() -> Self {
        ApiError::from_api_error_type(&DEFAULT_NOT_FOUND_TYPE)
    }

    pub fn bad_request() -> Self {
        ApiError::from_api_error_type(&DEFAULT_BAD_REQUEST_TYPE)
    }

    pub fn peer_not_found() -> Self {
        ApiError::from_api_error_type(&PEER_NOT_FOUND_TYPE)
    }

    pub fn detail<T: Into<String>>(mut self, detail: T) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn timestamp() -> String {
        let now: DateTime<Local> = Local::now();
        now.to_rfc3339()
    }

    fn extension_members(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("datetime".to_owned(), Value::from(ApiError::timestamp()));
        map
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.status)
    }
}

impl std::error::Error for ApiError {}

impl Reply for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body<'a> {
            #[serde(flatten)]
            err: &'a ApiError,
            #[serde(flatten)]
            ext: Map<String, Value>,
        }
        let body = Body {
            ext: self.extension_members(),
            err: &self,
        };
        let mut res = json(&body).into_response();
        *res.status_mut() = self.status;
        res.headers_mut().insert(
            "Content-Type",
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

impl Reject for ApiError {}

/// Converts `ApiError`s (and anything else we recognize) produced anywhere in
/// the filter tree into an RFC7807 response, the same role
/// `interledger-settlement`'s `default_rejection_handler` plays.
pub async fn default_rejection_handler(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(api_error) = err.find::<ApiError>() {
        Ok(api_error.clone().into_response())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        Ok(ApiError::from_api_error_type(&ApiErrorType {
            r#type: &ProblemType::Default,
            title: "Method Not Allowed",
            status: http::StatusCode::METHOD_NOT_ALLOWED,
        })
        .into_response())
    } else if err.is_not_found() {
        Ok(ApiError::not_found().into_response())
    } else {
        Ok(ApiError::bad_request()
            .detail(format!("{:?}", err))
            .into_response())
    }
}

/// Errors raised by a [`crate::store::SettlementStore`] implementation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("attempted to reassign peer ledger account for an account that already has one")]
    PeerReassignment,
    #[error("settlement account not found")]
    AccountNotFound,
    #[error("underlying store backend error: {0}")]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

#[cfg(feature = "redis-store")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound => ApiError::not_found(),
            other => ApiError::internal_server_error().detail(other.to_string()),
        }
    }
}

/// Errors raised by a [`crate::ledger::LedgerClient`] implementation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("ledger transport error: {0}")]
    Transport(String),
    #[error("ledger rejected the transaction: {0}")]
    Rejected(String),
    #[error("ledger transaction was not received in time")]
    Unreceived,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::internal_server_error().detail(err.to_string())
    }
}

/// Errors raised while loading/validating configuration at startup.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read key file {0}: {1}")]
    KeyFile(String, std::io::Error),
    #[error("invalid hex in key file {0}: {1}")]
    KeyHex(String, hex::FromHexError),
    #[error("configuration error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("asset-scale must be in [0, 18], got {0}")]
    InvalidAssetScale(u8),
}
