use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use crate::{
    error::{AppError, AppResult},
    models::{Movie, MovieId},
    services::{recommendations::Recommender, similarity::SimilarityMatrix},
};

#[derive(Debug, Deserialize)]
struct CatalogColumns {
    #[serde(alias = "id")]
    movie_id: Column<MovieId>,
    #[serde(alias = "title_x")]
    title: Column<String>,
}

/// A single catalog column, either keyed by row label or as a plain array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Column<T> {
    Dense(Vec<T>),
    Labeled(BTreeMap<String, T>),
}

impl<T> Column<T> {
    /// Values paired with their numeric row label, in label order
    ///
    /// Labels need not be contiguous; a filtered frame keeps its original
    /// index. Dense columns are labeled `0..n`.
    fn into_rows(self, name: &str) -> AppResult<Vec<(usize, T)>> {
        match self {
            Column::Dense(values) => Ok(values.into_iter().enumerate().collect()),
            Column::Labeled(labeled) => {
                let mut rows = labeled
                    .into_iter()
                    .map(|(label, value)| {
                        label.trim().parse::<usize>().map(|row| (row, value)).map_err(|_| {
                            AppError::Load(format!(
                                "catalog column '{}' has non-numeric row label '{}'",
                                name, label
                            ))
                        })
                    })
                    .collect::<AppResult<Vec<_>>>()?;
                rows.sort_by_key(|(row, _)| *row);

                if let Some(pair) = rows.windows(2).find(|pair| pair[0].0 == pair[1].0) {
                    return Err(AppError::Load(format!(
                        "catalog column '{}' has duplicate row label {}",
                        name, pair[0].0
                    )));
                }

                Ok(rows)
            }
        }
    }
}

impl CatalogColumns {
    fn into_movies(self) -> AppResult<Vec<Movie>> {
        let ids = self.movie_id.into_rows("movie_id")?;
        let titles = self.title.into_rows("title")?;

        if ids.len() != titles.len() {
            return Err(AppError::Load(format!(
                "catalog columns differ in length: {} movie IDs, {} titles",
                ids.len(),
                titles.len()
            )));
        }

        ids.into_iter()
            .zip(titles)
            .map(|((id_row, movie_id), (title_row, title))| {
                if id_row != title_row {
                    return Err(AppError::Load(format!(
                        "catalog columns disagree on row labels: movie_id has {}, title has {}",
                        id_row, title_row
                    )));
                }
                Ok(Movie { movie_id, title })
            })
            .collect()
    }
}

/// Parses a catalog as records (`[{"movie_id": .., "title": ..}]`) or as
/// columns (`{"movie_id": {"0": ..}, "title": {"0": ..}}`)
fn parse_catalog(value: Value, path: &Path) -> AppResult<Vec<Movie>> {
    let invalid = |layout: &str, e: serde_json::Error| {
        AppError::Load(format!(
            "invalid {} catalog in {}: {}",
            layout,
            path.display(),
            e
        ))
    };

    match value {
        Value::Array(_) => serde_json::from_value(value).map_err(|e| invalid("records", e)),
        Value::Object(_) => serde_json::from_value::<CatalogColumns>(value)
            .map_err(|e| invalid("columnar", e))?
            .into_movies(),
        _ => Err(AppError::Load(format!(
            "catalog in {} must be an array of records or an object of columns, found {}",
            path.display(),
            json_kind(&value)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Loads the catalog and similarity matrix and builds the recommender
///
/// Loading is all-or-nothing: any missing file, parse failure or misalignment
/// is reported as [`AppError::Load`] and nothing is served.
pub fn load_recommender(catalog_path: &Path, similarity_path: &Path) -> AppResult<Recommender> {
    let catalog = load_catalog(catalog_path)?;
    let matrix = load_similarity(similarity_path)?;
    let recommender = Recommender::new(catalog, matrix)?;

    tracing::info!(
        catalog = %catalog_path.display(),
        similarity = %similarity_path.display(),
        movies = recommender.len(),
        "Recommendation data loaded"
    );

    Ok(recommender)
}

/// Reads the movie catalog in any supported layout
pub fn load_catalog(path: &Path) -> AppResult<Vec<Movie>> {
    let value: Value = read_json(path)?;
    parse_catalog(value, path)
}

/// Reads a similarity matrix stored as nested JSON arrays
pub fn load_similarity(path: &Path) -> AppResult<SimilarityMatrix> {
    let rows: Vec<Vec<f64>> = read_json(path)?;
    SimilarityMatrix::from_rows(rows)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let file = File::open(path)
        .map_err(|e| AppError::Load(format!("cannot open {}: {}", path.display(), e)))?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::Load(format!("cannot parse {}: {}", path.display(), e)))
}
