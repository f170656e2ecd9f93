use super::{make_context, parse_id};
use crate::services::views::{self, PostDetail, PostList};
use crate::web::error::{AppError, AppResult};
use crate::web::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Html;
use serde::Deserialize;
use std::sync::Arc;
use tera::Context;

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

fn render_list(state: &AppState, list: &PostList, q: Option<&str>) -> AppResult<Html<String>> {
    let mut ctx = make_context(state)?;
    ctx.extend(Context::from_serialize(list)?);
    if let Some(q) = q {
        ctx.insert("q", q);
    }

    let html = state.templates.render("public/index.html", &ctx)?;
    Ok(Html(html))
}

pub(crate) fn render_detail(state: &AppState, detail: &PostDetail) -> AppResult<Html<String>> {
    let mut ctx = make_context(state)?;
    ctx.extend(Context::from_serialize(detail)?);

    let html = state.templates.render("public/detail.html", &ctx)?;
    Ok(Html(html))
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let list = views::index(
        &*state.repo,
        state.config.content.posts_per_page,
        query.page.as_deref(),
    )?;
    render_list(&state, &list, None)
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let detail = views::post_detail(&*state.repo, parse_id(&id)?)?;
    render_detail(&state, &detail)
}

pub async fn archives(
    State(state): State<Arc<AppState>>,
    Path((year, month)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let year: i32 = year.parse().map_err(|_| AppError::NotFound)?;
    let month: u32 = month.parse().map_err(|_| AppError::NotFound)?;

    let list = views::archives(
        &*state.repo,
        year,
        month,
        state.config.content.posts_per_page,
        query.page.as_deref(),
    )?;
    render_list(&state, &list, None)
}

pub async fn category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let list = views::category(
        &*state.repo,
        parse_id(&id)?,
        state.config.content.posts_per_page,
        query.page.as_deref(),
    )?;
    render_list(&state, &list, None)
}

pub async fn tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let list = views::tag(
        &*state.repo,
        parse_id(&id)?,
        state.config.content.posts_per_page,
        query.page.as_deref(),
    )?;
    render_list(&state, &list, None)
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Html<String>> {
    let list = views::search(&*state.repo, query.q.as_deref())?;
    render_list(&state, &list, query.q.as_deref())
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}
