use super::handlers;
use super::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub fn blog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::blog::index))
        .route("/post/:id", get(handlers::blog::detail))
        .route("/archives/:year/:month", get(handlers::blog::archives))
        .route("/category/:id", get(handlers::blog::category))
        .route("/tag/:id", get(handlers::blog::tag))
        .route("/search", get(handlers::blog::search))
        .route("/all/rss/", get(handlers::feed::rss_feed))
}

pub fn comment_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/comment/post/:id",
        get(handlers::comments::back_to_post).post(handlers::comments::post_comment),
    )
}
