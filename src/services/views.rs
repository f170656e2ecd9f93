//! View-models for every blog page.
//!
//! Each function takes a [`ContentRepository`] and request parameters and
//! returns a serializable record for the template layer. Nothing here knows
//! about HTTP.

use crate::models::{
    ArchiveMonth, CategoryWithCount, Comment, CommentForm, FormErrors, Post, PostQuery,
    TagWithCount,
};
use crate::services::comments;
use crate::services::markdown::{self, TocEntry, DETAIL_EXTENSIONS};
use crate::services::pagination::{Page, PageError, PaginationWindow, Paginator};
use crate::services::repository::ContentRepository;
use serde::Serialize;
use thiserror::Error;

pub const EMPTY_SEARCH_MESSAGE: &str = "Please enter a search keyword";

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<PageError> for ViewError {
    fn from(_: PageError) -> Self {
        ViewError::NotFound("page")
    }
}

pub type ViewResult<T> = Result<T, ViewError>;

/// A page of posts plus what the list template needs to draw its navigation.
#[derive(Debug, Serialize)]
pub struct PostList {
    pub posts: Vec<Post>,
    /// `None` for listings that are not paginated.
    pub page: Option<Page>,
    pub pagination: Option<PaginationWindow>,
    /// Describes the filter, e.g. the category name.
    pub heading: Option<String>,
    pub error_msg: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub body_html: String,
    pub toc: Vec<TocEntry>,
    pub toc_html: String,
    pub comments: Vec<Comment>,
    pub comment_count: usize,
    pub form: CommentForm,
    pub errors: FormErrors,
}

pub enum CommentOutcome {
    /// Stored; the client should be sent back to the post.
    Created { comment_id: i64, redirect: String },
    /// Failed validation; the detail page is shown again with the errors.
    Invalid(Box<PostDetail>),
}

#[derive(Debug, Serialize)]
pub struct Sidebar {
    pub recent_posts: Vec<Post>,
    pub archives: Vec<ArchiveMonth>,
    pub categories: Vec<CategoryWithCount>,
    pub tags: Vec<TagWithCount>,
}

fn paged<R: ContentRepository + ?Sized>(
    repo: &R,
    query: &PostQuery,
    per_page: usize,
    raw_page: Option<&str>,
    heading: Option<String>,
) -> ViewResult<PostList> {
    let count = repo.count_posts(query)?;
    let paginator = Paginator::new(count, per_page);
    let number = paginator.parse_page(raw_page)?;
    let page = paginator.page(number)?;

    let posts = repo.list_posts(query, Some(page.limit), page.offset)?;
    let pagination = page.window();

    Ok(PostList {
        posts,
        page: Some(page),
        pagination,
        heading,
        error_msg: None,
    })
}

pub fn index<R: ContentRepository + ?Sized>(
    repo: &R,
    per_page: usize,
    raw_page: Option<&str>,
) -> ViewResult<PostList> {
    paged(repo, &PostQuery::default(), per_page, raw_page, None)
}

/// Posts created in the given month. An impossible month simply has no posts.
pub fn archives<R: ContentRepository + ?Sized>(
    repo: &R,
    year: i32,
    month: u32,
    per_page: usize,
    raw_page: Option<&str>,
) -> ViewResult<PostList> {
    let heading = format!("{} / {:02}", year, month);
    paged(
        repo,
        &PostQuery::archive(year, month),
        per_page,
        raw_page,
        Some(heading),
    )
}

pub fn category<R: ContentRepository + ?Sized>(
    repo: &R,
    category_id: i64,
    per_page: usize,
    raw_page: Option<&str>,
) -> ViewResult<PostList> {
    let category = repo
        .category(category_id)?
        .ok_or(ViewError::NotFound("category"))?;
    paged(
        repo,
        &PostQuery::category(category.id),
        per_page,
        raw_page,
        Some(category.name),
    )
}

pub fn tag<R: ContentRepository + ?Sized>(
    repo: &R,
    tag_id: i64,
    per_page: usize,
    raw_page: Option<&str>,
) -> ViewResult<PostList> {
    let tag = repo.tag(tag_id)?.ok_or(ViewError::NotFound("tag"))?;
    paged(
        repo,
        &PostQuery::tag(tag.id),
        per_page,
        raw_page,
        Some(tag.name),
    )
}

/// Keyword search over title and body. A missing or empty query is not an
/// error: it yields no posts and a message asking for a keyword. Any other
/// query, whitespace included, is matched literally.
pub fn search<R: ContentRepository + ?Sized>(repo: &R, q: Option<&str>) -> ViewResult<PostList> {
    let keyword = q.unwrap_or_default();
    if keyword.is_empty() {
        return Ok(PostList {
            posts: Vec::new(),
            page: None,
            pagination: None,
            heading: None,
            error_msg: Some(EMPTY_SEARCH_MESSAGE.to_string()),
        });
    }

    let posts = repo.list_posts(&PostQuery::keyword(keyword), None, 0)?;
    Ok(PostList {
        posts,
        page: None,
        pagination: None,
        heading: Some(keyword.to_string()),
        error_msg: None,
    })
}

/// Detail page for a post. Counts as one view.
pub fn post_detail<R: ContentRepository + ?Sized>(repo: &R, post_id: i64) -> ViewResult<PostDetail> {
    let mut post = repo.post(post_id)?.ok_or(ViewError::NotFound("post"))?;
    post.views = repo.increase_views(post.id)?;
    detail(repo, post, CommentForm::default(), FormErrors::default())
}

fn detail<R: ContentRepository + ?Sized>(
    repo: &R,
    post: Post,
    form: CommentForm,
    errors: FormErrors,
) -> ViewResult<PostDetail> {
    let rendered = markdown::render(&post.body, &DETAIL_EXTENSIONS);
    let toc_html = rendered.toc_html();
    let comments = repo.comments(post.id)?;

    Ok(PostDetail {
        post,
        body_html: rendered.html,
        toc: rendered.toc,
        toc_html,
        comment_count: comments.len(),
        comments,
        form,
        errors,
    })
}

/// Validate and store a comment on a post. Invalid input is handed back as
/// a detail page carrying the submitted values and field errors; the view
/// counter is left alone in that case.
pub fn post_comment<R: ContentRepository + ?Sized>(
    repo: &R,
    post_id: i64,
    form: CommentForm,
) -> ViewResult<CommentOutcome> {
    let post = repo.post(post_id)?.ok_or(ViewError::NotFound("post"))?;

    match comments::validate(&form) {
        Ok(comment) => {
            let comment_id = repo.create_comment(post.id, &comment)?;
            tracing::info!("New comment {} on post {}", comment_id, post.id);
            Ok(CommentOutcome::Created {
                comment_id,
                redirect: post.url(),
            })
        }
        Err(errors) => {
            tracing::debug!("Rejected comment on post {}: {} field(s)", post.id, errors.len());
            let page = detail(repo, post, form, errors)?;
            Ok(CommentOutcome::Invalid(Box::new(page)))
        }
    }
}

/// Sidebar shown on every page. Categories and tags without posts are left out.
pub fn sidebar<R: ContentRepository + ?Sized>(repo: &R, recent: usize) -> ViewResult<Sidebar> {
    let recent_posts = repo.list_posts(&PostQuery::default(), Some(recent), 0)?;
    let archives = repo.archive_months()?;
    let categories = repo
        .categories_with_counts()?
        .into_iter()
        .filter(|c| c.count > 0)
        .collect();
    let tags = repo
        .tags_with_counts()?
        .into_iter()
        .filter(|t| t.count > 0)
        .collect();

    Ok(Sidebar {
        recent_posts,
        archives,
        categories,
        tags,
    })
}
