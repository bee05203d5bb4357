//! Process-wide setup.
//!
//! Only logging needs global initialization; database connections and HTTP
//! clients are created per run from the [`crate::Config`].

mod logger;

pub use logger::init_logger_with;
