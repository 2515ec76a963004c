pub mod advanced;
pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_select;
pub mod filter_where;
pub mod page;
pub mod params;
pub mod types;

pub use advanced::{advanced_results, ListOptions};
pub use error::FilterError;
pub use filter::Filter;
pub use filter_order::FilterOrder;
pub use filter_select::FilterSelect;
pub use filter_where::FilterWhere;
pub use page::PageWindow;
pub use params::QueryParams;
pub use types::*;
