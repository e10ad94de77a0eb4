//! Route protection.
//!
//! [`require_session`] is layered onto protected routers with
//! `axum::middleware::from_fn_with_state`. Requests without a live session never reach
//! the handler.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::{instrument, trace};

use crate::{
    AppState,
    auth::{current_user::AuthenticatedUser, session::SessionError},
    errors::Error,
    types::SessionToken,
};

/// Find the session token in the request's `Cookie` headers.
///
/// Returns the first non-empty value of a cookie named `cookie_name`. Headers that are not
/// valid UTF-8 are skipped.
pub fn session_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<SessionToken> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| SessionToken::from(value))
}

/// Reject the request with 401 unless it carries a live session cookie.
///
/// On success the [`AuthenticatedUser`] is stored in the request extensions.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn require_session(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, Error> {
    let token = session_token_from_headers(request.headers(), &state.config.auth.session.cookie_name)
        .ok_or(Error::Session(SessionError::NotFound))?;

    let user_id = state.sessions.resolve(&token).await?;
    trace!(user_id, "Session resolved");

    request.extensions_mut().insert(AuthenticatedUser { user_id, token });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_state, login_cookie};
    use axum::{Router, http::HeaderValue, http::StatusCode, middleware::from_fn_with_state, routing::get};
    use axum_test::TestServer;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn headers_with(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        headers
    }

    #[test]
    fn test_session_token_from_headers() {
        let headers = headers_with(&["theme=dark; authgate_session=abc123; other=x"]);
        assert_eq!(
            session_token_from_headers(&headers, "authgate_session"),
            Some(SessionToken::new("abc123"))
        );
        assert_eq!(session_token_from_headers(&headers, "missing"), None);
    }

    #[test]
    fn test_session_token_across_multiple_cookie_headers() {
        let headers = headers_with(&["theme=dark", "authgate_session=from-second-header"]);
        assert_eq!(
            session_token_from_headers(&headers, "authgate_session"),
            Some(SessionToken::new("from-second-header"))
        );
    }

    #[test]
    fn test_empty_or_prefixed_cookie_names_ignored() {
        let headers = headers_with(&["authgate_session=; xauthgate_session=nope"]);
        assert_eq!(session_token_from_headers(&headers, "authgate_session"), None);
    }

    fn protected_app(state: AppState, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/protected",
                get(move |user: AuthenticatedUser| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        user.user_id.to_string()
                    }
                }),
            )
            .layer(from_fn_with_state(state.clone(), require_session))
            .with_state(state)
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_cookie_short_circuits() {
        let state = create_test_state();
        let hits = Arc::new(AtomicUsize::new(0));
        let server = TestServer::new(protected_app(state, hits.clone())).unwrap();

        let response = server.get("/protected").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_token_short_circuits() {
        let state = create_test_state();
        let hits = Arc::new(AtomicUsize::new(0));
        let server = TestServer::new(protected_app(state, hits.clone())).unwrap();

        let response = server
            .get("/protected")
            .add_header("cookie", "authgate_session=not-a-real-session")
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_valid_session_reaches_handler() {
        let state = create_test_state();
        let (user_id, cookie) = login_cookie(&state, "alice", "a@x.com", "p1").await;
        let hits = Arc::new(AtomicUsize::new(0));
        let server = TestServer::new(protected_app(state, hits.clone())).unwrap();

        let response = server.get("/protected").add_header("cookie", cookie).await;
        response.assert_status_ok();
        response.assert_text(user_id.to_string());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_destroyed_session_rejected() {
        let state = create_test_state();
        let (_, cookie) = login_cookie(&state, "alice", "a@x.com", "p1").await;
        let token = cookie.split_once('=').map(|(_, t)| SessionToken::from(t)).unwrap();
        state.sessions.destroy(&token).await.unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let server = TestServer::new(protected_app(state, hits.clone())).unwrap();

        server
            .get("/protected")
            .add_header("cookie", cookie)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
