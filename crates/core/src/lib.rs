pub mod config;
pub mod context;
pub mod error;
pub mod feed;
pub mod feedwatcher;
pub mod importer;
pub mod matcher;
pub mod metrics;
pub mod notify;
pub mod paths;
pub mod store;
pub mod testing;
pub mod torrent;
pub mod torrent_client;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use context::{CancelHandle, RunContext};
pub use error::{PipelineError, RunErrors};
pub use feedwatcher::{FeedRunReport, FeedWatcher};
pub use importer::{AuthorSubscriptionImporter, BookImporter, ImportRunReport};
pub use matcher::AuthorMatcher;
pub use store::{SqliteStore, Store};
