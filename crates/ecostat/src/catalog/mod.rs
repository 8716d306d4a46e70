pub mod loader;
pub mod search;

pub use loader::{load_catalog, load_catalog_from_str};
pub use search::{keyword_tokens, overlap_score, KeywordCatalog};
