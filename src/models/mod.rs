mod author;
mod category;
mod comment;
mod post;
mod tag;

pub use author::*;
pub use category::*;
pub use comment::*;
pub use post::*;
pub use tag::*;
