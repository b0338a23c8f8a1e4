//! Concrete pages and visible-area producers.

mod static_page;

pub use static_page::StaticPage;
