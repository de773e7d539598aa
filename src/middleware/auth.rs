use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::core::{AppError, Caller, Role};

/// Header carrying the authenticated account id, set by the upstream auth layer
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying the authenticated role (`admin` or `customer`)
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Handlers take a `Caller` argument to receive the resolved identity.
/// Requests without identity headers are rejected with 403.
impl FromRequest for Caller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(caller_from_headers(req))
    }
}

fn caller_from_headers(req: &HttpRequest) -> Result<Caller, AppError> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let user_id = header(USER_ID_HEADER)
        .ok_or_else(|| AppError::forbidden("Missing caller identity"))?
        .parse::<i64>()
        .map_err(|_| AppError::validation(format!("{} must be a numeric id", USER_ID_HEADER)))?;

    let role: Role = header(USER_ROLE_HEADER)
        .ok_or_else(|| AppError::forbidden("Missing caller role"))?
        .parse()?;

    Ok(Caller { user_id, role })
}
