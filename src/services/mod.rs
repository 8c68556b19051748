pub mod providers;
pub mod recommendations;
pub mod similarity;

pub use providers::{DisabledProvider, MetadataProvider, TmdbProvider};
pub use recommendations::Recommender;
pub use similarity::SimilarityMatrix;
