pub mod dates;
pub mod types;

pub use dates::{format_date, recent_window, within_window, Period};
pub use types::{
    Cycle, FetchedItem, ProviderFailure, QueryParameters, SeriesData, Statistic, StatisticItem,
};
