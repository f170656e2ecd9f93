use crate::models::{
    ArchiveMonth, Author, AuthorSummary, Category, CategoryWithCount, Comment, CreatePost,
    NewComment, Post, PostQuery, Tag, TagWithCount, UpdatePost, CATEGORY_NAME_MAX_LENGTH,
    EXCERPT_MAX_LENGTH, TAG_NAME_MAX_LENGTH, TITLE_MAX_LENGTH,
};
use crate::services::markdown;
use crate::Database;
use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;

/// Storage operations the blog views rely on.
///
/// Post listings are always ordered newest first. Saving a post with an
/// empty excerpt derives one from its body.
pub trait ContentRepository: Send + Sync {
    fn post(&self, id: i64) -> Result<Option<Post>>;
    fn list_posts(&self, query: &PostQuery, limit: Option<usize>, offset: usize)
        -> Result<Vec<Post>>;
    fn count_posts(&self, query: &PostQuery) -> Result<usize>;
    fn create_post(&self, input: CreatePost) -> Result<i64>;
    fn update_post(&self, id: i64, input: UpdatePost) -> Result<()>;
    /// Adds one to the post's view counter and returns the new value.
    fn increase_views(&self, id: i64) -> Result<u32>;

    fn category(&self, id: i64) -> Result<Option<Category>>;
    fn category_by_name(&self, name: &str) -> Result<Option<Category>>;
    fn create_category(&self, name: &str) -> Result<i64>;
    fn categories_with_counts(&self) -> Result<Vec<CategoryWithCount>>;

    fn tag(&self, id: i64) -> Result<Option<Tag>>;
    fn tag_by_name(&self, name: &str) -> Result<Option<Tag>>;
    fn create_tag(&self, name: &str) -> Result<i64>;
    fn tags_with_counts(&self) -> Result<Vec<TagWithCount>>;

    fn author_by_username(&self, username: &str) -> Result<Option<Author>>;
    fn create_author(&self, username: &str, email: &str) -> Result<i64>;
    fn list_authors(&self) -> Result<Vec<Author>>;

    /// Comments under a post, oldest first.
    fn comments(&self, post_id: i64) -> Result<Vec<Comment>>;
    fn create_comment(&self, post_id: i64, comment: &NewComment) -> Result<i64>;

    /// Months that have posts, newest first.
    fn archive_months(&self) -> Result<Vec<ArchiveMonth>>;
}

#[derive(Clone)]
pub struct SqliteRepository {
    db: Database,
}

impl SqliteRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.body, p.created_time, p.modified_time, p.excerpt, p.views,
           c.id, c.name, a.id, a.username
    FROM posts p
    JOIN categories c ON c.id = p.category_id
    JOIN authors a ON a.id = p.author_id
"#;

fn row_to_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        created_time: row.get(3)?,
        modified_time: row.get(4)?,
        excerpt: row.get(5)?,
        views: row.get(6)?,
        category: Category {
            id: row.get(7)?,
            name: row.get(8)?,
        },
        tags: Vec::new(),
        author: AuthorSummary {
            id: row.get(9)?,
            username: row.get(10)?,
        },
    })
}

fn row_to_author(row: &Row) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_comment(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        url: row.get(4)?,
        text: row.get(5)?,
        created_time: row.get(6)?,
    })
}

/// `WHERE` clause over `posts p` for a query, with its bound values.
fn where_clause(query: &PostQuery) -> (String, Vec<Value>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut params: Vec<Value> = Vec::new();

    if let Some(category_id) = query.category_id {
        sql.push_str(" AND p.category_id = ?");
        params.push(Value::Integer(category_id));
    }
    if let Some(tag_id) = query.tag_id {
        sql.push_str(" AND p.id IN (SELECT post_id FROM post_tags WHERE tag_id = ?)");
        params.push(Value::Integer(tag_id));
    }
    if let Some((year, month)) = query.archive {
        sql.push_str(
            " AND CAST(strftime('%Y', p.created_time) AS INTEGER) = ? \
             AND CAST(strftime('%m', p.created_time) AS INTEGER) = ?",
        );
        params.push(Value::Integer(i64::from(year)));
        params.push(Value::Integer(i64::from(month)));
    }
    if let Some(keyword) = &query.keyword {
        let pattern = format!("%{}%", escape_like(keyword));
        sql.push_str(" AND (p.title LIKE ? ESCAPE '\\' OR p.body LIKE ? ESCAPE '\\')");
        params.push(Value::Text(pattern.clone()));
        params.push(Value::Text(pattern));
    }

    (sql, params)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn attach_tags(conn: &Connection, posts: &mut [Post]) -> Result<()> {
    if posts.is_empty() {
        return Ok(());
    }

    let placeholders = posts.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT pt.post_id, t.id, t.name
         FROM tags t
         JOIN post_tags pt ON t.id = pt.tag_id
         WHERE pt.post_id IN ({})
         ORDER BY t.name",
        placeholders
    );
    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            Tag {
                id: row.get(1)?,
                name: row.get(2)?,
            },
        ))
    })?;

    let mut tags_by_post: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in rows {
        let (post_id, tag) = row?;
        tags_by_post.entry(post_id).or_default().push(tag);
    }

    for post in posts.iter_mut() {
        post.tags = tags_by_post.remove(&post.id).unwrap_or_default();
    }

    Ok(())
}

fn set_tags(conn: &Connection, post_id: i64, tag_ids: &[i64]) -> Result<()> {
    for tag_id in tag_ids {
        conn.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)",
            (post_id, tag_id),
        )?;
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        bail!("Title cannot be empty");
    }
    if title.chars().count() > TITLE_MAX_LENGTH {
        bail!("Title must be {} characters or less", TITLE_MAX_LENGTH);
    }
    Ok(())
}

fn validate_excerpt(excerpt: &str) -> Result<()> {
    if excerpt.chars().count() > EXCERPT_MAX_LENGTH {
        bail!("Excerpt must be {} characters or less", EXCERPT_MAX_LENGTH);
    }
    Ok(())
}

fn validate_name(kind: &str, name: &str, max: usize) -> Result<()> {
    if name.trim().is_empty() {
        bail!("{} name cannot be empty", kind);
    }
    if name.chars().count() > max {
        bail!("{} name must be {} characters or less", kind, max);
    }
    Ok(())
}

impl ContentRepository for SqliteRepository {
    fn post(&self, id: i64) -> Result<Option<Post>> {
        let conn = self.db.get()?;
        let post = conn
            .query_row(&format!("{} WHERE p.id = ?", POST_SELECT), [id], row_to_post)
            .optional()?;

        match post {
            Some(post) => {
                let mut posts = [post];
                attach_tags(&conn, &mut posts)?;
                let [post] = posts;
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    fn list_posts(
        &self,
        query: &PostQuery,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Post>> {
        let conn = self.db.get()?;
        let (filter, mut params) = where_clause(query);
        let sql = format!(
            "{}{} ORDER BY p.created_time DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_SELECT, filter
        );
        // SQLite treats a negative LIMIT as unbounded
        params.push(Value::Integer(limit.map_or(-1, |l| l as i64)));
        params.push(Value::Integer(offset as i64));

        let mut stmt = conn.prepare(&sql)?;
        let mut posts = stmt
            .query_map(params_from_iter(params.iter()), row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;

        attach_tags(&conn, &mut posts)?;
        Ok(posts)
    }

    fn count_posts(&self, query: &PostQuery) -> Result<usize> {
        let conn = self.db.get()?;
        let (filter, params) = where_clause(query);
        let sql = format!("SELECT COUNT(*) FROM posts p{}", filter);
        let count: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn create_post(&self, input: CreatePost) -> Result<i64> {
        validate_title(&input.title)?;
        validate_excerpt(&input.excerpt)?;

        let excerpt = markdown::ensure_excerpt(input.excerpt, &input.body);
        let created_time = input.created_time.unwrap_or_else(Utc::now);

        let mut conn = self.db.get()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO posts (title, body, created_time, modified_time, excerpt, category_id, author_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            (
                &input.title,
                &input.body,
                created_time,
                created_time,
                &excerpt,
                input.category_id,
                input.author_id,
            ),
        )?;
        let post_id = tx.last_insert_rowid();
        set_tags(&tx, post_id, &input.tag_ids)?;
        tx.commit()?;

        tracing::debug!("Created post id={} '{}'", post_id, input.title);
        Ok(post_id)
    }

    fn update_post(&self, id: i64, input: UpdatePost) -> Result<()> {
        let mut conn = self.db.get()?;
        let tx = conn.transaction()?;

        let (title, body, excerpt, category_id): (String, String, String, i64) = tx
            .query_row(
                "SELECT title, body, excerpt, category_id FROM posts WHERE id = ?",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?
            .ok_or_else(|| anyhow!("Post {} not found", id))?;

        let title = input.title.unwrap_or(title);
        validate_title(&title)?;
        let body = input.body.unwrap_or(body);
        let excerpt = input.excerpt.unwrap_or(excerpt);
        validate_excerpt(&excerpt)?;
        let excerpt = markdown::ensure_excerpt(excerpt, &body);
        let category_id = input.category_id.unwrap_or(category_id);

        tx.execute(
            r#"
            UPDATE posts SET title = ?, body = ?, excerpt = ?, category_id = ?, modified_time = ?
            WHERE id = ?
            "#,
            (&title, &body, &excerpt, category_id, Utc::now(), id),
        )?;

        if let Some(tag_ids) = input.tag_ids {
            tx.execute("DELETE FROM post_tags WHERE post_id = ?", [id])?;
            set_tags(&tx, id, &tag_ids)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn increase_views(&self, id: i64) -> Result<u32> {
        let conn = self.db.get()?;
        let views = conn.query_row(
            "UPDATE posts SET views = views + 1 WHERE id = ? RETURNING views",
            [id],
            |row| row.get(0),
        )?;
        Ok(views)
    }

    fn category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.db.get()?;
        let category = conn
            .query_row("SELECT id, name FROM categories WHERE id = ?", [id], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(category)
    }

    fn category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let conn = self.db.get()?;
        let category = conn
            .query_row("SELECT id, name FROM categories WHERE name = ?", [name], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(category)
    }

    fn create_category(&self, name: &str) -> Result<i64> {
        validate_name("Category", name, CATEGORY_NAME_MAX_LENGTH)?;
        let conn = self.db.get()?;
        conn.execute("INSERT INTO categories (name) VALUES (?)", [name.trim()])?;
        Ok(conn.last_insert_rowid())
    }

    fn categories_with_counts(&self) -> Result<Vec<CategoryWithCount>> {
        let conn = self.db.get()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.name, COUNT(p.id) AS count
            FROM categories c
            LEFT JOIN posts p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )?;
        let categories = stmt
            .query_map([], |row| {
                Ok(CategoryWithCount {
                    category: Category {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    },
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn tag(&self, id: i64) -> Result<Option<Tag>> {
        let conn = self.db.get()?;
        let tag = conn
            .query_row("SELECT id, name FROM tags WHERE id = ?", [id], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(tag)
    }

    fn tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let conn = self.db.get()?;
        let tag = conn
            .query_row("SELECT id, name FROM tags WHERE name = ?", [name], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(tag)
    }

    fn create_tag(&self, name: &str) -> Result<i64> {
        validate_name("Tag", name, TAG_NAME_MAX_LENGTH)?;
        let conn = self.db.get()?;
        conn.execute("INSERT INTO tags (name) VALUES (?)", [name.trim()])?;
        Ok(conn.last_insert_rowid())
    }

    fn tags_with_counts(&self) -> Result<Vec<TagWithCount>> {
        let conn = self.db.get()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.name, COUNT(pt.post_id) AS count
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            GROUP BY t.id
            ORDER BY count DESC, t.name
            "#,
        )?;
        let tags = stmt
            .query_map([], |row| {
                Ok(TagWithCount {
                    tag: Tag {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    },
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn author_by_username(&self, username: &str) -> Result<Option<Author>> {
        let conn = self.db.get()?;
        let author = conn
            .query_row(
                "SELECT id, username, email, created_at FROM authors WHERE username = ?",
                [username],
                row_to_author,
            )
            .optional()?;
        Ok(author)
    }

    fn create_author(&self, username: &str, email: &str) -> Result<i64> {
        validate_name("Author", username, 150)?;
        if !email.contains('@') {
            bail!("Invalid email format");
        }
        let conn = self.db.get()?;
        conn.execute(
            "INSERT INTO authors (username, email, created_at) VALUES (?, ?, ?)",
            (username.trim(), email.trim(), Utc::now()),
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_authors(&self) -> Result<Vec<Author>> {
        let conn = self.db.get()?;
        let mut stmt =
            conn.prepare("SELECT id, username, email, created_at FROM authors ORDER BY username")?;
        let authors = stmt
            .query_map([], row_to_author)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(authors)
    }

    fn comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let conn = self.db.get()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, post_id, name, email, url, text, created_time
            FROM comments
            WHERE post_id = ?
            ORDER BY created_time ASC, id ASC
            "#,
        )?;
        let comments = stmt
            .query_map([post_id], row_to_comment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn create_comment(&self, post_id: i64, comment: &NewComment) -> Result<i64> {
        let conn = self.db.get()?;
        conn.execute(
            "INSERT INTO comments (post_id, name, email, url, text, created_time) VALUES (?, ?, ?, ?, ?, ?)",
            (
                post_id,
                &comment.name,
                &comment.email,
                &comment.url,
                &comment.text,
                Utc::now(),
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn archive_months(&self) -> Result<Vec<ArchiveMonth>> {
        let conn = self.db.get()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT CAST(strftime('%Y', created_time) AS INTEGER) AS year,
                   CAST(strftime('%m', created_time) AS INTEGER) AS month,
                   COUNT(*)
            FROM posts
            GROUP BY year, month
            ORDER BY year DESC, month DESC
            "#,
        )?;
        let months = stmt
            .query_map([], |row| {
                Ok(ArchiveMonth {
                    year: row.get(0)?,
                    month: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(months)
    }
}
