use super::{open_repository, TaxonomyCommand};
use crate::services::repository::ContentRepository;
use anyhow::Result;
use std::path::Path;

pub async fn run_category(config_path: &Path, command: TaxonomyCommand) -> Result<()> {
    let (_, repo) = open_repository(config_path)?;

    match command {
        TaxonomyCommand::Add { name } => {
            let name = name.trim();
            if repo.category_by_name(name)?.is_some() {
                anyhow::bail!("Category '{}' already exists", name);
            }
            let id = repo.create_category(name)?;
            tracing::info!("Category '{}' created (id {})", name, id);
        }
        TaxonomyCommand::List => {
            let rows = repo
                .categories_with_counts()?
                .into_iter()
                .map(|c| (c.category.id, c.category.name, c.count));
            print_table(rows);
        }
    }

    Ok(())
}

pub async fn run_tag(config_path: &Path, command: TaxonomyCommand) -> Result<()> {
    let (_, repo) = open_repository(config_path)?;

    match command {
        TaxonomyCommand::Add { name } => {
            let name = name.trim();
            if repo.tag_by_name(name)?.is_some() {
                anyhow::bail!("Tag '{}' already exists", name);
            }
            let id = repo.create_tag(name)?;
            tracing::info!("Tag '{}' created (id {})", name, id);
        }
        TaxonomyCommand::List => {
            let rows = repo
                .tags_with_counts()?
                .into_iter()
                .map(|t| (t.tag.id, t.tag.name, t.count));
            print_table(rows);
        }
    }

    Ok(())
}

fn print_table(rows: impl Iterator<Item = (i64, String, i64)>) {
    println!("{:<6} {:<30} {:>6}", "ID", "NAME", "POSTS");
    println!("{}", "-".repeat(44));
    for (id, name, count) in rows {
        println!("{:<6} {:<30} {:>6}", id, name, count);
    }
}
