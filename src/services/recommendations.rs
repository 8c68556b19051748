use rand::Rng;
use std::collections::{HashMap, HashSet};

use crate::{
    error::{AppError, AppResult},
    models::{to_percentage, CatalogStats, Movie, MovieId, Recommendation},
    services::similarity::SimilarityMatrix,
};

/// Fewest seed titles accepted by a batch recommendation
pub const MIN_BATCH_TITLES: usize = 2;
/// Most seed titles accepted by a batch recommendation
pub const MAX_BATCH_TITLES: usize = 5;

/// Item-to-item recommender over a precomputed similarity matrix
///
/// Holds the movie catalog and a square similarity matrix aligned to it by
/// position. Both are immutable once constructed, so a single instance can be
/// shared behind an `Arc` by any number of concurrent readers.
#[derive(Debug)]
pub struct Recommender {
    catalog: Vec<Movie>,
    matrix: SimilarityMatrix,
    /// First catalog position for each title
    title_index: HashMap<String, usize>,
    /// First catalog position for each movie ID
    id_index: HashMap<MovieId, usize>,
    stats: CatalogStats,
}

impl Recommender {
    /// Creates a recommender, validating that the matrix is aligned with the catalog
    pub fn new(catalog: Vec<Movie>, matrix: SimilarityMatrix) -> AppResult<Self> {
        if catalog.is_empty() {
            return Err(AppError::Load("movie catalog is empty".to_string()));
        }

        if matrix.dim() != catalog.len() {
            return Err(AppError::Load(format!(
                "similarity matrix has {} rows, catalog has {} movies",
                matrix.dim(),
                catalog.len()
            )));
        }

        let mut title_index = HashMap::with_capacity(catalog.len());
        let mut id_index = HashMap::with_capacity(catalog.len());
        for (position, movie) in catalog.iter().enumerate() {
            title_index.entry(movie.title.clone()).or_insert(position);
            id_index.entry(movie.movie_id).or_insert(position);
        }

        if title_index.len() < catalog.len() {
            tracing::warn!(
                duplicates = catalog.len() - title_index.len(),
                "Catalog contains duplicate titles; title lookups resolve to the first match"
            );
        }
        if id_index.len() < catalog.len() {
            tracing::warn!(
                duplicates = catalog.len() - id_index.len(),
                "Catalog contains duplicate movie IDs; ID lookups resolve to the first match"
            );
        }

        let stats = CatalogStats {
            total_movies: catalog.len(),
            average_similarity: matrix.mean_off_diagonal().map(to_percentage),
        };

        Ok(Self {
            catalog,
            matrix,
            title_index,
            id_index,
            stats,
        })
    }

    /// Recommends the `k` movies most similar to `title`
    ///
    /// The seed itself is never returned. Results are ordered by descending
    /// similarity, ties keep catalog order, and every result scores at least
    /// `min_similarity`.
    pub fn recommend_single(
        &self,
        title: &str,
        k: usize,
        min_similarity: f64,
    ) -> AppResult<Vec<Recommendation>> {
        validate_k(k)?;
        validate_threshold(min_similarity)?;
        let position = self.position_of_title(title)?;

        let recommendations = self.rank_row(position, k, min_similarity);

        tracing::debug!(
            title = %title,
            k = k,
            min_similarity = min_similarity,
            results = recommendations.len(),
            "Single recommendation computed"
        );

        Ok(recommendations)
    }

    /// Same as [`Recommender::recommend_single`], keyed by the unique movie ID
    pub fn recommend_by_id(
        &self,
        movie_id: MovieId,
        k: usize,
        min_similarity: f64,
    ) -> AppResult<Vec<Recommendation>> {
        validate_k(k)?;
        validate_threshold(min_similarity)?;
        let position = self.position_of_id(movie_id)?;

        let recommendations = self.rank_row(position, k, min_similarity);

        tracing::debug!(
            movie_id = %movie_id,
            k = k,
            min_similarity = min_similarity,
            results = recommendations.len(),
            "Recommendation by ID computed"
        );

        Ok(recommendations)
    }

    /// Recommends movies similar to all of `titles` at once
    ///
    /// Averages the similarity rows of every seed and ranks the catalog by that
    /// mean. Movies whose title is among the seeds are excluded.
    pub fn recommend_batch<S: AsRef<str>>(
        &self,
        titles: &[S],
        k: usize,
    ) -> AppResult<Vec<Recommendation>> {
        validate_k(k)?;
        if titles.len() < MIN_BATCH_TITLES || titles.len() > MAX_BATCH_TITLES {
            return Err(AppError::InvalidArgument(format!(
                "Batch recommendations need between {} and {} titles, got {}",
                MIN_BATCH_TITLES,
                MAX_BATCH_TITLES,
                titles.len()
            )));
        }

        let positions = titles
            .iter()
            .map(|title| self.position_of_title(title.as_ref()))
            .collect::<AppResult<Vec<_>>>()?;

        let mut totals = vec![0.0f64; self.catalog.len()];
        for &position in &positions {
            for (total, score) in totals.iter_mut().zip(self.matrix.row(position)) {
                *total += score;
            }
        }

        let count = positions.len() as f64;
        let mut scored: Vec<(usize, f64)> = totals
            .into_iter()
            .map(|total| total / count)
            .enumerate()
            .collect();
        sort_descending(&mut scored);

        let seeds: HashSet<&str> = titles.iter().map(|title| title.as_ref()).collect();
        let recommendations: Vec<Recommendation> = scored
            .into_iter()
            .filter(|(position, _)| !seeds.contains(self.catalog[*position].title.as_str()))
            .take(k)
            .map(|(position, score)| self.recommendation(position, score))
            .collect();

        tracing::debug!(
            seeds = titles.len(),
            k = k,
            results = recommendations.len(),
            "Batch recommendation computed"
        );

        Ok(recommendations)
    }

    /// Picks `n` distinct movies uniformly at random, capped at the catalog size
    pub fn sample_random<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<&Movie> {
        let amount = n.min(self.catalog.len());
        rand::seq::index::sample(rng, self.catalog.len(), amount)
            .into_iter()
            .map(|position| &self.catalog[position])
            .collect()
    }

    /// Looks up a single movie by ID
    pub fn movie(&self, movie_id: MovieId) -> AppResult<&Movie> {
        self.position_of_id(movie_id)
            .map(|position| &self.catalog[position])
    }

    /// A page of the catalog in catalog order
    pub fn movies(&self, offset: usize, limit: usize) -> &[Movie] {
        let start = offset.min(self.catalog.len());
        let end = start.saturating_add(limit).min(self.catalog.len());
        &self.catalog[start..end]
    }

    /// Case-insensitive substring search over titles, in catalog order
    pub fn search(&self, query: &str, limit: usize) -> AppResult<Vec<&Movie>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(AppError::InvalidArgument(
                "Search query cannot be empty".to_string(),
            ));
        }

        Ok(self
            .catalog
            .iter()
            .filter(|movie| movie.title.to_lowercase().contains(&needle))
            .take(limit)
            .collect())
    }

    pub fn stats(&self) -> &CatalogStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    fn position_of_title(&self, title: &str) -> AppResult<usize> {
        self.title_index
            .get(title)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("Movie '{}' is not in the catalog", title)))
    }

    fn position_of_id(&self, movie_id: MovieId) -> AppResult<usize> {
        self.id_index
            .get(&movie_id)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("Movie {} is not in the catalog", movie_id)))
    }

    fn rank_row(&self, position: usize, k: usize, min_similarity: f64) -> Vec<Recommendation> {
        let mut scored: Vec<(usize, f64)> = self
            .matrix
            .row(position)
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != position)
            .map(|(other, score)| (other, *score))
            .collect();
        sort_descending(&mut scored);

        scored
            .into_iter()
            .filter(|(_, score)| *score >= min_similarity)
            .take(k)
            .map(|(other, score)| self.recommendation(other, score))
            .collect()
    }

    fn recommendation(&self, position: usize, score: f64) -> Recommendation {
        let movie = &self.catalog[position];
        Recommendation {
            title: movie.title.clone(),
            movie_id: movie.movie_id,
            similarity: to_percentage(score),
        }
    }
}

/// Stable descending sort by score
fn sort_descending(scored: &mut [(usize, f64)]) {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
}

fn validate_k(k: usize) -> AppResult<()> {
    if k < 1 {
        return Err(AppError::InvalidArgument(
            "Number of recommendations must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_threshold(min_similarity: f64) -> AppResult<()> {
    if !(0.0..=1.0).contains(&min_similarity) {
        return Err(AppError::InvalidArgument(format!(
            "Minimum similarity must be between 0 and 1, got {}",
            min_similarity
        )));
    }
    Ok(())
}
