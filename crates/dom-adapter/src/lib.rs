//! Live-document adapter.
//!
//! `PageDom` is a mutable model of one loaded page: the parsed tree plus an
//! inline-style overlay. `scraper::Html` is not `Send`, so the document is
//! owned by a dedicated host thread (`PageHost`) and everything else talks
//! to it through a cloneable async `PageHandle`.

pub mod errors;
pub mod host;
pub mod page;

pub use errors::DomError;
pub use host::{PageHandle, PageHost};
pub use page::PageDom;

pub use ego_tree::NodeId;
