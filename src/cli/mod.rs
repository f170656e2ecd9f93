pub mod author;
pub mod init;
pub mod migrate;
pub mod post;
pub mod serve;
pub mod taxonomy;

use crate::services::repository::SqliteRepository;
use crate::{Config, Database};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "inkpot")]
#[command(version)]
#[command(about = "A small Markdown blog", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "inkpot.toml", env = "INKPOT_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new blog directory with a starter config
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    /// Run migrations and start the web server
    Serve {
        /// Overrides server.host
        #[arg(short = 'H', long)]
        host: Option<String>,
        /// Overrides server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations
    Migrate,
    Author {
        #[command(subcommand)]
        command: AuthorCommand,
    },
    Category {
        #[command(subcommand)]
        command: TaxonomyCommand,
    },
    Tag {
        #[command(subcommand)]
        command: TaxonomyCommand,
    },
    Post {
        #[command(subcommand)]
        command: PostCommand,
    },
}

#[derive(Subcommand)]
pub enum AuthorCommand {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    List,
}

#[derive(Subcommand)]
pub enum TaxonomyCommand {
    Add { name: String },
    List,
}

#[derive(Subcommand)]
pub enum PostCommand {
    /// Publish a post from a Markdown file
    Add {
        #[arg(long)]
        title: String,
        /// Category name
        #[arg(long)]
        category: String,
        /// Author username
        #[arg(long)]
        author: String,
        /// Tag name; repeat for several tags. Missing tags are created.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Derived from the body when omitted
        #[arg(long)]
        excerpt: Option<String>,
        /// Markdown file holding the body
        file: PathBuf,
    },
    /// Change an existing post; only the given fields are touched
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Replaces every tag on the post. Missing tags are created.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Pass an empty value to derive it again from the body
        #[arg(long)]
        excerpt: Option<String>,
        /// Markdown file holding the new body
        #[arg(long)]
        file: Option<PathBuf>,
    },
    List,
}

/// Load the config and open a migrated repository.
pub(crate) fn open_repository(config_path: &Path) -> Result<(Config, SqliteRepository)> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database)?;
    db.migrate()?;
    Ok((config, SqliteRepository::new(db)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_edit_arguments() {
        let cli = Cli::try_parse_from([
            "inkpot", "post", "edit", "7", "--excerpt", "", "--tag", "rust", "--tag", "web",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Post {
                command:
                    PostCommand::Edit {
                        id,
                        title,
                        tags,
                        excerpt,
                        file,
                        ..
                    },
            }) => {
                assert_eq!(id, 7);
                assert!(title.is_none());
                assert_eq!(tags, vec!["rust", "web"]);
                assert_eq!(excerpt.as_deref(), Some(""));
                assert!(file.is_none());
            }
            _ => panic!("expected post edit"),
        }
    }
}
