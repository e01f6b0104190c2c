//! Catalog query engine: search predicates, page arithmetic and presentation

pub mod pagination;
pub mod presentation;
pub mod search;

pub use pagination::{PageInfo, PageRequest, Paginated, PAGE_SIZE};
pub use presentation::{annotate, to_export_row, DisplayBook, ExportRow, ExportValue};
pub use search::{Predicate, SearchMode};
