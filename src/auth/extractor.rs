//! Actix-web extractor resolving who submitted a request.
//!
//! # Security
//! - API keys from headers are wrapped in `SecretString` immediately
//! - Secret values are never logged or exposed in debug output

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use secrecy::{ExposeSecret, SecretString};
use std::future::{ready, Ready};

use super::ApiKeys;
use crate::config::API_KEY_HEADER;
use crate::error::ErrorResponse;

/// Requester recorded when the API runs without configured keys.
pub const ANONYMOUS_REQUESTER: &str = "anonymous";

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message.clone(),
        })
    }
}

/// Identity and origin of the caller submitting a job.
///
/// ```ignore
/// async fn handler(requester: Requester) -> impl Responder {
///     // requester.name is recorded on the job row
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Requester {
    pub name: String,
    /// Client address as reported by the connection (proxy headers honored).
    pub client_ip: Option<String>,
}

impl FromRequest for Requester {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let client_ip = req
            .connection_info()
            .realip_remote_addr()
            .map(str::to_string);

        let keys = match req.app_data::<web::Data<ApiKeys>>() {
            Some(keys) => keys,
            None => {
                return ready(Err(AuthError {
                    message: "Internal configuration error".to_string(),
                }));
            }
        };

        if keys.is_open() {
            return ready(Ok(Requester {
                name: ANONYMOUS_REQUESTER.to_string(),
                client_ip,
            }));
        }

        let provided: Option<SecretString> = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| SecretString::from(s.to_string()));

        let result = match provided {
            Some(ref key) => match keys.verify(key.expose_secret()) {
                Some(name) => Ok(Requester {
                    name: name.to_string(),
                    client_ip,
                }),
                None => Err(AuthError {
                    message: "Invalid API key".to_string(),
                }),
            },
            None => Err(AuthError {
                message: "Missing API key. Provide X-API-Key header.".to_string(),
            }),
        };

        ready(result)
    }
}
