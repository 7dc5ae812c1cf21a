//! Content module - snapshot loading, entry resolution, and markdown

mod collection;
mod entry;
mod markdown;
mod resolve;
mod snapshot;

pub use collection::Collections;
pub use entry::{ContentType, Entry, LocalizedField, Sys};
pub use markdown::MarkdownRenderer;
pub use resolve::{
    AssetFile, AssetRef, AuthorContent, AuthorRef, FieldResolver, IndexContent, PageContent,
    PostContent, ResolvedContent,
};
pub use snapshot::{ContentError, ContentSnapshot};
