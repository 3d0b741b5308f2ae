//! Per request context: the caller's identity, their session cookie and their deadline.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{FromRef, FromRequest, FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{error, info, warn};

use crate::domain::{
    cart::{CartError, Identity, SessionId, SessionSlot, UserId},
    stores::{SessionStore, StoreError},
};

use super::{ClientError, SessionSettings, Settings};

/// Lets a caller ask for a tighter deadline than the server default.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// JSON body extractor whose rejections use the API's error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ClientError))]
pub struct ApiJson<T>(pub T);

/// Resumes the session named by the cookie when the server issued it and it has not
/// expired. Anything else, including ids the client made up, gets a freshly opened session
/// and a new cookie. The id is handed to handlers through request extensions.
pub async fn session_middleware(
    State(settings): State<Settings>,
    State(sessions): State<Arc<dyn SessionStore>>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = session_cookie(request.headers(), &settings.session.cookie_name);
    let session = match resume_or_open(sessions.as_ref(), presented).await {
        Ok(session) => Some(session),
        Err(e) => {
            error!("Session store unavailable, continuing without a session: {e}");
            None
        }
    };
    if let Some((session_id, _)) = session {
        request.extensions_mut().insert(session_id);
    }

    let mut response = next.run(request).await;

    if let Some((session_id, true)) = session {
        match session_cookie_header(&settings.session, session_id) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Could not build session cookie: {e}"),
        }
    }
    response
}

/// Returns the session to use and whether it was just opened.
async fn resume_or_open(
    sessions: &dyn SessionStore,
    presented: Option<SessionId>,
) -> Result<(SessionId, bool), StoreError> {
    if let Some(session_id) = presented {
        if sessions.is_active(session_id).await? {
            return Ok((session_id, false));
        }
        info!("Unknown or expired session cookie presented. Issuing a new session.");
    }
    let session_id = SessionId::new();
    sessions.open_session(session_id).await?;
    Ok((session_id, true))
}

fn session_cookie(headers: &HeaderMap, name: &str) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| value.parse().ok())
}

fn session_cookie_header(
    settings: &SessionSettings,
    session_id: SessionId,
) -> Result<HeaderValue, header::InvalidHeaderValue> {
    let secure = if settings.secure_cookie { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={session_id}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{secure}",
        settings.cookie_name,
        settings.ttl().as_secs()
    ))
}

/// Who the request is for. The user id is forwarded by the authentication gateway; the
/// session exists only when the session middleware is installed.
#[derive(Debug)]
pub struct RequestIdentity(pub Identity);

impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
    Settings: FromRef<S>,
    Arc<dyn SessionStore>: FromRef<S>,
{
    type Rejection = ClientError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let settings = Settings::from_ref(state);
        let user_id = parts
            .headers
            .get(settings.session.user_header.as_str())
            .map(|value| {
                value
                    .to_str()
                    .map_err(|_| CartError::InvalidUserId(format!("{value:?}")))
            })
            .transpose()?
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(UserId::parse)
            .transpose()?;

        let session = parts
            .extensions
            .get::<SessionId>()
            .map(|session_id| {
                SessionSlot::new(*session_id, <Arc<dyn SessionStore>>::from_ref(state))
            });

        Ok(Self(Identity { user_id, session }))
    }
}

/// How long the current operation may take.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline(pub Duration);

impl<S> FromRequestParts<S> for RequestDeadline
where
    S: Send + Sync,
    Settings: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let default = Settings::from_ref(state).application.request_timeout();
        let requested = parts
            .headers
            .get(REQUEST_TIMEOUT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_millis);
        Ok(Self(requested.map_or(default, |requested| requested.min(default))))
    }
}
