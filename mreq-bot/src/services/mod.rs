//! External service clients

pub mod catalogue;
pub mod netease_client;
pub mod quality_resolver;

pub use catalogue::{CatalogueError, CatalogueSong, MusicCatalogue, SongDetail};
pub use netease_client::NeteaseClient;
pub use quality_resolver::{QualityResolver, ResolveError, ResolvedAudio};
