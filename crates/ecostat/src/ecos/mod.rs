//! Bank of Korea ECOS statistics provider.

pub mod client;
pub mod parse;

pub use client::{EcosClient, EcosSettings};
pub use parse::{parse_item_list, parse_series};
