use crate::models::PostQuery;
use crate::services::feed;
use crate::web::error::AppResult;
use crate::web::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub async fn rss_feed(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let limit = match state.config.content.feed_limit {
        0 => None,
        n => Some(n),
    };
    let posts = state.repo.list_posts(&PostQuery::default(), limit, 0)?;
    let rss = feed::rss(&state.config.site, &posts)?;

    Ok((
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        rss,
    )
        .into_response())
}
