use super::{open_repository, AuthorCommand};
use crate::services::repository::ContentRepository;
use anyhow::Result;
use std::path::Path;

pub async fn run(config_path: &Path, command: AuthorCommand) -> Result<()> {
    let (_, repo) = open_repository(config_path)?;

    match command {
        AuthorCommand::Add { username, email } => {
            if repo.author_by_username(&username)?.is_some() {
                anyhow::bail!("Author '{}' already exists", username);
            }
            let id = repo.create_author(&username, &email)?;
            tracing::info!("Author '{}' created (id {})", username, id);
        }
        AuthorCommand::List => {
            println!("{:<6} {:<20} {:<30}", "ID", "USERNAME", "EMAIL");
            println!("{}", "-".repeat(56));
            for author in repo.list_authors()? {
                println!(
                    "{:<6} {:<20} {:<30}",
                    author.id, author.username, author.email
                );
            }
        }
    }

    Ok(())
}
