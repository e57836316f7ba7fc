pub mod discover;
pub mod error;
pub mod fetcher;
pub mod render;
pub mod result;
pub mod scheduler;

pub use discover::{Discoverer, PageLayout};
pub use error::ScanError;
pub use fetcher::{StarFetcher, StarSource};
pub use render::{BadgeRenderer, BadgeStyle};
pub use result::{Badge, RepoLink, RepoStars, StarCount};
pub use scheduler::{BatchCallback, BatchPolicy, BatchProgress, BatchScheduler};
