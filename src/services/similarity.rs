use crate::error::{AppError, AppResult};

/// Dense square matrix of pairwise similarity scores, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    dim: usize,
    scores: Vec<f64>,
}

impl SimilarityMatrix {
    /// Builds a matrix from nested rows, rejecting ragged or non-finite input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> AppResult<Self> {
        let dim = rows.len();
        let mut scores = Vec::with_capacity(dim * dim);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dim {
                return Err(AppError::Load(format!(
                    "similarity matrix is not square: row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    dim
                )));
            }
            if let Some(j) = row.iter().position(|score| !score.is_finite()) {
                return Err(AppError::Load(format!(
                    "similarity matrix has a non-finite score at ({}, {})",
                    i, j
                )));
            }
            scores.extend(row);
        }

        Ok(Self { dim, scores })
    }

    /// Number of rows (and columns)
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Similarity scores of item `index` against every item.
    ///
    /// Panics if `index` is out of bounds.
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.dim;
        &self.scores[start..start + self.dim]
    }

    /// Mean of all off-diagonal scores, or `None` when there are none.
    pub fn mean_off_diagonal(&self) -> Option<f64> {
        if self.dim < 2 {
            return None;
        }

        let total: f64 = (0..self.dim)
            .map(|i| {
                self.row(i)
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, score)| *score)
                    .sum::<f64>()
            })
            .sum();

        Some(total / (self.dim * (self.dim - 1)) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_square() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0, 0.5], vec![0.5, 1.0]]).unwrap();
        assert_eq!(matrix.dim(), 2);
        assert_eq!(matrix.row(1), &[0.5, 1.0]);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let result = SimilarityMatrix::from_rows(vec![vec![1.0, 0.5], vec![0.5]]);
        assert!(matches!(result, Err(AppError::Load(_))));
    }

    #[test]
    fn test_from_rows_rejects_non_square() {
        let result = SimilarityMatrix::from_rows(vec![vec![1.0, 0.5, 0.2], vec![0.5, 1.0, 0.3]]);
        assert!(matches!(result, Err(AppError::Load(_))));
    }

    #[test]
    fn test_from_rows_rejects_non_finite() {
        let result = SimilarityMatrix::from_rows(vec![vec![1.0, f64::NAN], vec![0.5, 1.0]]);
        assert!(matches!(result, Err(AppError::Load(_))));

        let result = SimilarityMatrix::from_rows(vec![vec![1.0, 0.5], vec![f64::INFINITY, 1.0]]);
        assert!(matches!(result, Err(AppError::Load(_))));
    }

    #[test]
    fn test_from_rows_keeps_full_precision() {
        let matrix =
            SimilarityMatrix::from_rows(vec![vec![1.0, 0.500000001], vec![0.500000001, 1.0]])
                .unwrap();
        assert_eq!(matrix.row(0)[1], 0.500000001);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = SimilarityMatrix::from_rows(Vec::new()).unwrap();
        assert_eq!(matrix.dim(), 0);
        assert_eq!(matrix.mean_off_diagonal(), None);
    }

    #[test]
    fn test_mean_off_diagonal() {
        let matrix = SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.5, 0.25],
            vec![0.5, 1.0, 0.75],
            vec![0.25, 0.75, 1.0],
        ])
        .unwrap();
        assert_eq!(matrix.mean_off_diagonal(), Some(0.5));
    }
}
