use chrono::{DateTime, TimeZone, Utc};
use inkpot::models::{CommentForm, CreatePost, NewComment, PostQuery, UpdatePost};
use inkpot::services::repository::{ContentRepository, SqliteRepository};
use inkpot::services::views::{self, CommentOutcome, EMPTY_SEARCH_MESSAGE};
use inkpot::Database;

fn create_test_repo() -> SqliteRepository {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let id: u32 = rng.gen();
    let name = format!("test_db_{}", id);

    let db = Database::open_memory(&name).expect("Failed to create test database");
    db.migrate().expect("Failed to run migrations");
    SqliteRepository::new(db)
}

struct Fixture {
    repo: SqliteRepository,
    author: i64,
    python: i64,
    rust: i64,
    web: i64,
    cli: i64,
}

fn fixture() -> Fixture {
    let repo = create_test_repo();
    let author = repo
        .create_author("ada", "ada@example.com")
        .expect("Failed to create author");
    let python = repo.create_category("Python").expect("Failed to create category");
    let rust = repo.create_category("Rust").expect("Failed to create category");
    let web = repo.create_tag("web").expect("Failed to create tag");
    let cli = repo.create_tag("cli").expect("Failed to create tag");
    Fixture {
        repo,
        author,
        python,
        rust,
        web,
        cli,
    }
}

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

impl Fixture {
    fn post(&self, title: &str, body: &str, category: i64, tags: &[i64], when: DateTime<Utc>) -> i64 {
        self.repo
            .create_post(CreatePost {
                title: title.to_string(),
                body: body.to_string(),
                excerpt: String::new(),
                category_id: category,
                author_id: self.author,
                tag_ids: tags.to_vec(),
                created_time: Some(when),
            })
            .expect("Failed to create post")
    }
}

fn titles(posts: &[inkpot::models::Post]) -> Vec<&str> {
    posts.iter().map(|p| p.title.as_str()).collect()
}

mod repository_tests {
    use super::*;

    #[test]
    fn test_create_and_get_post() {
        let f = fixture();
        let id = f.post("Hello", "Some **body**.", f.rust, &[f.web, f.cli], at(2024, 1, 5));

        let post = f.repo.post(id).unwrap().expect("Post should exist");
        assert_eq!(post.title, "Hello");
        assert_eq!(post.category.name, "Rust");
        assert_eq!(post.author.username, "ada");
        assert_eq!(post.views, 0);
        assert_eq!(post.created_time, at(2024, 1, 5));
        // tags come back sorted by name
        let tag_names: Vec<&str> = post.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, vec!["cli", "web"]);
    }

    #[test]
    fn test_missing_post_is_none() {
        let f = fixture();
        assert!(f.repo.post(999).unwrap().is_none());
        assert!(f.repo.category(999).unwrap().is_none());
        assert!(f.repo.tag(999).unwrap().is_none());
    }

    #[test]
    fn test_excerpt_derived_when_empty() {
        let f = fixture();
        let body = "# Title\n\nThis paragraph is definitely longer than fifty-four characters in total.";
        let id = f.post("Derived", body, f.rust, &[], at(2024, 1, 1));

        let post = f.repo.post(id).unwrap().unwrap();
        assert!(post.excerpt.starts_with("Title"));
        assert_eq!(post.excerpt.chars().count(), 54);
        assert!(!post.excerpt.contains('<'));
    }

    #[test]
    fn test_explicit_excerpt_preserved() {
        let f = fixture();
        let id = f
            .repo
            .create_post(CreatePost {
                title: "Explicit".to_string(),
                body: "Body that would produce a different excerpt.".to_string(),
                excerpt: "Hand-written summary".to_string(),
                category_id: f.rust,
                author_id: f.author,
                tag_ids: vec![],
                created_time: None,
            })
            .unwrap();

        f.repo
            .update_post(
                id,
                UpdatePost {
                    body: Some("Completely new body.".to_string()),
                    ..UpdatePost::default()
                },
            )
            .unwrap();

        let post = f.repo.post(id).unwrap().unwrap();
        assert_eq!(post.excerpt, "Hand-written summary");
        assert_eq!(post.body, "Completely new body.");
    }

    #[test]
    fn test_clearing_excerpt_regenerates_it() {
        let f = fixture();
        let id = f.post("Regen", "Old body", f.rust, &[], at(2024, 1, 1));

        f.repo
            .update_post(
                id,
                UpdatePost {
                    body: Some("New body".to_string()),
                    excerpt: Some(String::new()),
                    ..UpdatePost::default()
                },
            )
            .unwrap();

        assert_eq!(f.repo.post(id).unwrap().unwrap().excerpt, "New body");
    }

    #[test]
    fn test_update_replaces_tags_and_keeps_views() {
        let f = fixture();
        let id = f.post("Tagged", "Body", f.rust, &[f.web], at(2024, 1, 1));
        f.repo.increase_views(id).unwrap();

        f.repo
            .update_post(
                id,
                UpdatePost {
                    title: Some("Retagged".to_string()),
                    category_id: Some(f.python),
                    tag_ids: Some(vec![f.cli]),
                    ..UpdatePost::default()
                },
            )
            .unwrap();

        let post = f.repo.post(id).unwrap().unwrap();
        assert_eq!(post.title, "Retagged");
        assert_eq!(post.category.id, f.python);
        assert_eq!(post.tags.len(), 1);
        assert_eq!(post.tags[0].id, f.cli);
        assert_eq!(post.views, 1);
        assert!(post.modified_time > post.created_time);
    }

    #[test]
    fn test_update_missing_post_fails() {
        let f = fixture();
        assert!(f.repo.update_post(404, UpdatePost::default()).is_err());
    }

    #[test]
    fn test_title_validation() {
        let f = fixture();
        let make = |title: String| CreatePost {
            title,
            body: "Body".to_string(),
            excerpt: String::new(),
            category_id: f.rust,
            author_id: f.author,
            tag_ids: vec![],
            created_time: None,
        };

        assert!(f.repo.create_post(make("a".repeat(70))).is_ok());
        assert!(f.repo.create_post(make("a".repeat(71))).is_err());
        assert!(f.repo.create_post(make("   ".to_string())).is_err());
    }

    #[test]
    fn test_excerpt_length_validation() {
        let f = fixture();
        let result = f.repo.create_post(CreatePost {
            title: "Long excerpt".to_string(),
            body: "Body".to_string(),
            excerpt: "x".repeat(201),
            category_id: f.rust,
            author_id: f.author,
            tag_ids: vec![],
            created_time: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_category_rejected() {
        let f = fixture();
        let result = f.repo.create_post(CreatePost {
            title: "Orphan".to_string(),
            body: "Body".to_string(),
            excerpt: String::new(),
            category_id: 999,
            author_id: f.author,
            tag_ids: vec![],
            created_time: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let f = fixture();
        assert!(f.repo.create_category("Rust").is_err());
        assert!(f.repo.create_tag("web").is_err());
        assert!(f.repo.create_author("ada", "other@example.com").is_err());
        assert!(f.repo.create_category("").is_err());
    }

    #[test]
    fn test_lookup_by_name() {
        let f = fixture();
        assert_eq!(f.repo.category_by_name("Rust").unwrap().unwrap().id, f.rust);
        assert_eq!(f.repo.tag_by_name("cli").unwrap().unwrap().id, f.cli);
        assert_eq!(
            f.repo.author_by_username("ada").unwrap().unwrap().id,
            f.author
        );
        assert!(f.repo.category_by_name("Go").unwrap().is_none());
        assert_eq!(f.repo.list_authors().unwrap().len(), 1);
    }

    #[test]
    fn test_list_newest_first() {
        let f = fixture();
        f.post("Middle", "b", f.rust, &[], at(2024, 2, 1));
        f.post("Oldest", "a", f.rust, &[], at(2024, 1, 1));
        f.post("Newest", "c", f.rust, &[], at(2024, 3, 1));

        let posts = f.repo.list_posts(&PostQuery::default(), None, 0).unwrap();
        assert_eq!(titles(&posts), vec!["Newest", "Middle", "Oldest"]);

        let page = f.repo.list_posts(&PostQuery::default(), Some(1), 1).unwrap();
        assert_eq!(titles(&page), vec!["Middle"]);
    }

    #[test]
    fn test_category_and_tag_filters() {
        let f = fixture();
        f.post("Py web", "a", f.python, &[f.web], at(2024, 1, 1));
        f.post("Rust cli", "b", f.rust, &[f.cli], at(2024, 1, 2));
        f.post("Rust web", "c", f.rust, &[f.web, f.cli], at(2024, 1, 3));

        let rust = f.repo.list_posts(&PostQuery::category(f.rust), None, 0).unwrap();
        assert_eq!(titles(&rust), vec!["Rust web", "Rust cli"]);
        assert_eq!(f.repo.count_posts(&PostQuery::category(f.rust)).unwrap(), 2);

        let web = f.repo.list_posts(&PostQuery::tag(f.web), None, 0).unwrap();
        assert_eq!(titles(&web), vec!["Rust web", "Py web"]);
        // the joined tag filter must not drop the post's other tags
        assert_eq!(web[0].tags.len(), 2);

        let both = PostQuery {
            category_id: Some(f.python),
            tag_id: Some(f.cli),
            ..PostQuery::default()
        };
        assert!(f.repo.list_posts(&both, None, 0).unwrap().is_empty());
    }

    #[test]
    fn test_archive_filter() {
        let f = fixture();
        f.post("Jan", "a", f.rust, &[], at(2024, 1, 31));
        f.post("Feb", "b", f.rust, &[], at(2024, 2, 1));
        f.post("Feb last year", "c", f.rust, &[], at(2023, 2, 10));

        let feb = f.repo.list_posts(&PostQuery::archive(2024, 2), None, 0).unwrap();
        assert_eq!(titles(&feb), vec!["Feb"]);
        assert!(f
            .repo
            .list_posts(&PostQuery::archive(2024, 13), None, 0)
            .unwrap()
            .is_empty());

        let months = f.repo.archive_months().unwrap();
        let pairs: Vec<(i32, u32, i64)> = months.iter().map(|m| (m.year, m.month, m.count)).collect();
        assert_eq!(pairs, vec![(2024, 2, 1), (2024, 1, 1), (2023, 2, 1)]);
    }

    #[test]
    fn test_keyword_matches_title_or_body_case_insensitively() {
        let f = fixture();
        f.post("Hello world", "nothing", f.rust, &[], at(2024, 1, 1));
        f.post("Other", "Well, HELLO there", f.rust, &[], at(2024, 1, 2));
        f.post("Unrelated", "goodbye", f.rust, &[], at(2024, 1, 3));

        let found = f.repo.list_posts(&PostQuery::keyword("hello"), None, 0).unwrap();
        assert_eq!(titles(&found), vec!["Other", "Hello world"]);
    }

    #[test]
    fn test_keyword_wildcards_are_literal() {
        let f = fixture();
        f.post("Discount", "100% off", f.rust, &[], at(2024, 1, 1));
        f.post("Plain", "100 percent", f.rust, &[], at(2024, 1, 2));

        let found = f.repo.list_posts(&PostQuery::keyword("100%"), None, 0).unwrap();
        assert_eq!(titles(&found), vec!["Discount"]);
        assert!(f
            .repo
            .list_posts(&PostQuery::keyword("_"), None, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_increase_views() {
        let f = fixture();
        let id = f.post("Counted", "Body", f.rust, &[], at(2024, 1, 1));

        for expected in 1..=5 {
            assert_eq!(f.repo.increase_views(id).unwrap(), expected);
        }
        assert_eq!(f.repo.post(id).unwrap().unwrap().views, 5);
    }

    #[test]
    fn test_increase_views_missing_post_fails() {
        let f = fixture();
        assert!(f.repo.increase_views(404).is_err());
    }

    #[test]
    fn test_comments_oldest_first() {
        let f = fixture();
        let id = f.post("Discussed", "Body", f.rust, &[], at(2024, 1, 1));
        let other = f.post("Quiet", "Body", f.rust, &[], at(2024, 1, 2));

        for text in ["first", "second"] {
            f.repo
                .create_comment(
                    id,
                    &NewComment {
                        name: "Bob".to_string(),
                        email: "bob@example.com".to_string(),
                        url: String::new(),
                        text: text.to_string(),
                    },
                )
                .unwrap();
        }

        let comments = f.repo.comments(id).unwrap();
        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(comments.iter().all(|c| c.post_id == id));
        assert!(f.repo.comments(other).unwrap().is_empty());
    }

    #[test]
    fn test_counts_include_empty_entries() {
        let f = fixture();
        f.post("One", "a", f.rust, &[f.web], at(2024, 1, 1));
        f.post("Two", "b", f.rust, &[f.web], at(2024, 1, 2));

        let categories = f.repo.categories_with_counts().unwrap();
        let python = categories.iter().find(|c| c.category.id == f.python).unwrap();
        let rust = categories.iter().find(|c| c.category.id == f.rust).unwrap();
        assert_eq!(python.count, 0);
        assert_eq!(rust.count, 2);

        let tags = f.repo.tags_with_counts().unwrap();
        assert_eq!(tags[0].tag.name, "web");
        assert_eq!(tags[0].count, 2);
    }
}

mod view_tests {
    use super::*;

    fn seven_posts(f: &Fixture) {
        for day in 1..=7 {
            f.post(&format!("Post {}", day), "Body", f.rust, &[], at(2024, 1, day));
        }
    }

    #[test]
    fn test_index_pagination() {
        let f = fixture();
        seven_posts(&f);

        let first = views::index(&f.repo, 3, None).unwrap();
        assert_eq!(titles(&first.posts), vec!["Post 7", "Post 6", "Post 5"]);
        let page = first.page.as_ref().unwrap();
        assert_eq!(page.num_pages, 3);
        assert!(page.has_next);
        let window = first.pagination.unwrap();
        assert_eq!(window.right, vec![2, 3]);
        assert!(!window.last);

        let last = views::index(&f.repo, 3, Some("3")).unwrap();
        assert_eq!(titles(&last.posts), vec!["Post 1"]);
        assert_eq!(last.pagination.unwrap().left, vec![1, 2]);
    }

    #[test]
    fn test_single_page_has_no_window() {
        let f = fixture();
        f.post("Only", "Body", f.rust, &[], at(2024, 1, 1));

        let list = views::index(&f.repo, 3, None).unwrap();
        assert_eq!(list.posts.len(), 1);
        assert!(list.pagination.is_none());
        assert!(!list.page.unwrap().is_paginated);
    }

    #[test]
    fn test_empty_blog_renders_first_page() {
        let f = fixture();
        let list = views::index(&f.repo, 3, None).unwrap();
        assert!(list.posts.is_empty());
        assert!(list.pagination.is_none());
    }

    #[test]
    fn test_category_view_heading() {
        let f = fixture();
        f.post("Snake", "a", f.python, &[], at(2024, 1, 1));
        f.post("Crab", "b", f.rust, &[], at(2024, 1, 2));

        let list = views::category(&f.repo, f.python, 3, None).unwrap();
        assert_eq!(list.heading.as_deref(), Some("Python"));
        assert_eq!(titles(&list.posts), vec!["Snake"]);

        let list = views::tag(&f.repo, f.cli, 3, None).unwrap();
        assert!(list.posts.is_empty());
        assert_eq!(list.heading.as_deref(), Some("cli"));
    }

    #[test]
    fn test_archives_view() {
        let f = fixture();
        f.post("March", "a", f.rust, &[], at(2024, 3, 3));
        f.post("April", "b", f.rust, &[], at(2024, 4, 4));

        let list = views::archives(&f.repo, 2024, 3, 3, None).unwrap();
        assert_eq!(titles(&list.posts), vec!["March"]);
        assert_eq!(list.heading.as_deref(), Some("2024 / 03"));
    }

    #[test]
    fn test_search_view() {
        let f = fixture();
        f.post("Say Hello", "x", f.rust, &[], at(2024, 1, 1));
        f.post("Quiet", "nothing to see", f.rust, &[], at(2024, 1, 2));

        let empty = views::search(&f.repo, Some("")).unwrap();
        assert!(empty.posts.is_empty());
        assert_eq!(empty.error_msg.as_deref(), Some(EMPTY_SEARCH_MESSAGE));

        let found = views::search(&f.repo, Some("hello")).unwrap();
        assert_eq!(titles(&found.posts), vec!["Say Hello"]);
        assert!(found.error_msg.is_none());
    }

    #[test]
    fn test_detail_counts_views() {
        let f = fixture();
        let id = f.post("Viewed", "# Top\n\n## Sub\n\nText", f.rust, &[], at(2024, 1, 1));

        for n in 1..=3 {
            let detail = views::post_detail(&f.repo, id).unwrap();
            assert_eq!(detail.post.views, n);
        }

        let detail = views::post_detail(&f.repo, id).unwrap();
        assert_eq!(detail.toc.len(), 1);
        assert_eq!(detail.toc[0].children[0].anchor, "sub");
        assert!(detail.toc_html.contains("href=\"#top\""));
        // stored markdown is untouched by rendering
        assert_eq!(detail.post.body, "# Top\n\n## Sub\n\nText");
    }

    #[test]
    fn test_valid_comment_is_stored() {
        let f = fixture();
        let id = f.post("Open", "Body", f.rust, &[], at(2024, 1, 1));

        let form = CommentForm {
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            url: "https://bob.example".to_string(),
            text: "Great read".to_string(),
        };
        match views::post_comment(&f.repo, id, form).unwrap() {
            CommentOutcome::Created { redirect, .. } => assert_eq!(redirect, format!("/post/{}", id)),
            CommentOutcome::Invalid(_) => panic!("valid comment rejected"),
        }

        let detail = views::post_detail(&f.repo, id).unwrap();
        assert_eq!(detail.comment_count, 1);
        assert_eq!(detail.comments[0].name, "Bob");
        assert!(detail.errors.is_empty());
    }

    #[test]
    fn test_sidebar_hides_empty_taxonomies() {
        let f = fixture();
        for day in 1..=6 {
            f.post(&format!("P{}", day), "Body", f.rust, &[f.web], at(2024, 1, day));
        }

        let sidebar = views::sidebar(&f.repo, 5).unwrap();
        assert_eq!(sidebar.recent_posts.len(), 5);
        assert_eq!(sidebar.recent_posts[0].title, "P6");
        assert_eq!(sidebar.categories.len(), 1);
        assert_eq!(sidebar.categories[0].category.name, "Rust");
        assert_eq!(sidebar.tags.len(), 1);
        assert_eq!(sidebar.archives.len(), 1);
        assert_eq!(sidebar.archives[0].count, 6);
    }
}
