use super::blog::render_detail;
use super::parse_id;
use crate::models::CommentForm;
use crate::services::views::{self, CommentOutcome};
use crate::web::error::AppResult;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use std::sync::Arc;

pub async fn post_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    match views::post_comment(&*state.repo, parse_id(&id)?, form)? {
        CommentOutcome::Created { redirect, .. } => Ok(Redirect::to(&redirect).into_response()),
        CommentOutcome::Invalid(detail) => Ok(render_detail(&state, &detail)?.into_response()),
    }
}

/// The comment endpoint only accepts submissions; anything else goes back
/// to the post.
pub async fn back_to_post(Path(id): Path<String>) -> AppResult<Redirect> {
    let id = parse_id(&id)?;
    Ok(Redirect::to(&format!("/post/{}", id)))
}
