pub mod actor;
pub mod dto;
pub mod genre;
mod paging;

pub use paging::{Page, Paging, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, TOTAL_COUNT_HEADER};
