pub mod models;
pub mod search;

pub use models::{CatalogProduct, Nutriments};
pub use search::CatalogClient;
