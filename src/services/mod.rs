pub mod comments;
pub mod feed;
pub mod markdown;
pub mod pagination;
pub mod repository;
pub mod views;
