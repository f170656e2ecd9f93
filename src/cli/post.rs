use super::{open_repository, PostCommand};
use crate::models::{CreatePost, PostQuery, UpdatePost};
use crate::services::repository::{ContentRepository, SqliteRepository};
use anyhow::{Context, Result};
use std::path::Path;

pub async fn run(config_path: &Path, command: PostCommand) -> Result<()> {
    let (_, repo) = open_repository(config_path)?;

    match command {
        PostCommand::Add {
            title,
            category,
            author,
            tags,
            excerpt,
            file,
        } => {
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("Could not read {}", file.display()))?;

            let category = repo
                .category_by_name(&category)?
                .ok_or_else(|| anyhow::anyhow!("Unknown category '{}'", category))?;
            let author = repo
                .author_by_username(&author)?
                .ok_or_else(|| anyhow::anyhow!("Unknown author '{}'", author))?;
            let tag_ids = resolve_tags(&repo, &tags)?;

            let id = repo.create_post(CreatePost {
                title: title.clone(),
                body,
                excerpt: excerpt.unwrap_or_default(),
                category_id: category.id,
                author_id: author.id,
                tag_ids,
                created_time: None,
            })?;
            tracing::info!("Post '{}' published at /post/{}", title, id);
        }
        PostCommand::Edit {
            id,
            title,
            category,
            tags,
            excerpt,
            file,
        } => {
            let body = file
                .map(|file| {
                    std::fs::read_to_string(&file)
                        .with_context(|| format!("Could not read {}", file.display()))
                })
                .transpose()?;
            let category_id = match category {
                Some(name) => Some(
                    repo.category_by_name(&name)?
                        .ok_or_else(|| anyhow::anyhow!("Unknown category '{}'", name))?
                        .id,
                ),
                None => None,
            };
            let tag_ids = if tags.is_empty() {
                None
            } else {
                Some(resolve_tags(&repo, &tags)?)
            };

            repo.update_post(
                id,
                UpdatePost {
                    title,
                    body,
                    excerpt,
                    category_id,
                    tag_ids,
                },
            )?;
            tracing::info!("Post {} updated", id);
        }
        PostCommand::List => {
            let posts = repo.list_posts(&PostQuery::default(), None, 0)?;
            println!(
                "{:<6} {:<40} {:<16} {:<12} {:>6}",
                "ID", "TITLE", "CATEGORY", "CREATED", "VIEWS"
            );
            println!("{}", "-".repeat(84));
            for post in posts {
                println!(
                    "{:<6} {:<40} {:<16} {:<12} {:>6}",
                    post.id,
                    post.title,
                    post.category.name,
                    post.created_time.format("%Y-%m-%d").to_string(),
                    post.views
                );
            }
        }
    }

    Ok(())
}

fn resolve_tags(repo: &SqliteRepository, names: &[String]) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names.iter().map(|n| n.trim()) {
        let id = match repo.tag_by_name(name)? {
            Some(tag) => tag.id,
            None => {
                let id = repo.create_tag(name)?;
                tracing::info!("Created tag '{}'", name);
                id
            }
        };
        ids.push(id);
    }
    Ok(ids)
}
