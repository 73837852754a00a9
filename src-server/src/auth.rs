use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

/// Identity of the back-office operator making the request, taken from the
/// `x-admin-id` header. Requests without the header are attributed to
/// "system".
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub String);

impl<S> FromRequestParts<S> for AdminIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get("x-admin-id")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .unwrap_or("system")
            .to_string();
        Ok(AdminIdentity(actor))
    }
}
