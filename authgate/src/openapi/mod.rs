//! OpenAPI documentation for the HTTP API, rendered with Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::{
        Components,
        security::{ApiKey, ApiKeyValue, SecurityScheme},
    },
};

use crate::api;

/// Session cookie security scheme, named after the configured cookie.
struct SessionCookieAddon<'a> {
    cookie_name: &'a str,
}

impl Modify for SessionCookieAddon<'_> {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.components.get_or_insert_with(Components::new).security_schemes.insert(
            "SessionCookie".to_string(),
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                self.cookie_name,
                "Opaque session token set by `POST /api/auth/login`.",
            ))),
        );
    }
}

/// The API document for a server whose session cookie is `cookie_name`.
pub fn api_doc(cookie_name: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    SessionCookieAddon { cookie_name }.modify(&mut doc);
    doc
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "authgate",
        description = "Credential authentication and server-side sessions"
    ),
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::users::list_users,
        api::handlers::users::get_current_user,
    ),
    components(schemas(
        api::models::auth::RegisterRequest,
        api::models::auth::RegisterResponse,
        api::models::auth::LoginRequest,
        api::models::auth::AuthResponse,
        api::models::auth::AuthSuccessResponse,
        api::models::users::UserResponse,
        api::models::users::CurrentUserResponse,
    )),
    tags(
        (name = "authentication", description = "Registration, login and logout"),
        (name = "users", description = "Session-protected user reads"),
    )
)]
pub struct ApiDoc;
