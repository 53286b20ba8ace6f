pub mod feed;
pub mod item;
pub mod tag;

pub use feed::Feed;
pub use item::Article;
pub use tag::TagStore;
