//! Not-found page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::{StatusCode, Uri},
    response::IntoResponse,
};

use crate::filters;
use crate::middleware::{Flash, Flashes, OptionalAuth};
use crate::models::CurrentUser;

/// 404 page template.
#[derive(Template, WebTemplate)]
#[template(path = "errors/404.html")]
pub struct NotFoundTemplate {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub path: String,
}

/// Render the 404 page with a 404 status.
///
/// Serves both `GET /404` and the router fallback.
pub async fn not_found(
    uri: Uri,
    OptionalAuth(user): OptionalAuth,
    Flashes(flashes): Flashes,
) -> impl IntoResponse {
    tracing::debug!(path = %uri.path(), "Not found");
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            user,
            flashes,
            path: uri.path().to_owned(),
        },
    )
}
