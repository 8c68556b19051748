pub mod loader;

pub use loader::{load_catalog, load_recommender, load_similarity};
