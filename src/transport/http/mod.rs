pub mod error;
pub mod extract;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod auth;
    pub mod books;
    pub mod common;
    pub mod health;
    pub mod ml;
    pub mod scraping;
    pub mod stats;
}

pub use error::ApiError;
pub use router::{create_router, ApiDoc};
pub use types::AppState;
