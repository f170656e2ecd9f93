use anyhow::Result;
use std::path::PathBuf;

pub async fn run(path: PathBuf, name: Option<String>) -> Result<()> {
    let site_name = name.unwrap_or_else(|| "My Blog".to_string());
    let config_path = path.join("inkpot.toml");

    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    std::fs::create_dir_all(&path)?;
    std::fs::create_dir_all(path.join("data"))?;

    std::fs::write(&config_path, starter_config(&site_name))?;

    tracing::info!("Created new blog at {:?}", path);
    tracing::info!("Run 'inkpot author add' to create an author");
    tracing::info!("Run 'inkpot serve' to start the server");

    Ok(())
}

fn starter_config(site_name: &str) -> String {
    format!(
        r#"[site]
title = "{}"
description = "A personal blog"
url = "http://localhost:3000"
language = "en"

[server]
host = "127.0.0.1"
port = 3000

[database]
path = "./data/inkpot.db"

[content]
posts_per_page = 3
recent_posts = 5
feed_limit = 0
"#,
        site_name.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn test_starter_config_parses() {
        let config = Config::parse(&starter_config("Quoted \"Blog\"")).unwrap();
        assert_eq!(config.site.title, "Quoted \"Blog\"");
        assert_eq!(config.content.posts_per_page, 3);
    }
}
