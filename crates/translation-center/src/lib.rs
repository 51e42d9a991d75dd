//! Tagged translation catalog with paginated multi-field search.

pub mod catalog;
pub mod error;
pub mod model;
pub mod paths;
pub mod seed;
pub mod store;

pub use catalog::Catalog;
pub use config::ServiceConfig;
pub use error::{CoreError, ErrorKind};
pub use paths::{Layout, default_root};
pub use seed::{SeedReport, Seeder};
pub use store::EntityStore;

pub mod config {
    mod service;

    pub use service::{
        DEFAULT_HTTP_BIND, HttpSection, SeedSection, ServiceConfig, StoreSection,
    };
}

// Long-running service
pub mod daemon {
    pub mod logging;

    pub mod serve;
}

pub mod web {
    pub mod http;
}
