pub mod blog;
pub mod comments;
pub mod feed;

use crate::services::views;
use crate::web::error::{AppError, AppResult};
use crate::web::state::AppState;
use tera::Context;

/// Site settings and the sidebar, shared by every page.
pub(crate) fn make_context(state: &AppState) -> AppResult<Context> {
    let sidebar = views::sidebar(&*state.repo, state.config.content.recent_posts)?;

    let mut ctx = Context::new();
    ctx.insert("site", &state.config.site);
    ctx.insert("sidebar", &sidebar);
    Ok(ctx)
}

/// Path ids that are not integers name nothing.
pub(crate) fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse().map_err(|_| AppError::NotFound)
}
