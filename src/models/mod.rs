//! Core data models for abstracts and search operations.

mod paper;
mod search;

pub use paper::{
    Abstract, AbstractBuilder, Author, AuthorRef, Category, CategoryRef, FullAbstract,
    ShortAbstract,
};
pub use search::{DetailResponse, Modifier, Page, PageLimits, SearchResponse};
