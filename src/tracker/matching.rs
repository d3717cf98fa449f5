//! Matching utilities: cost matrices and track/detection assignment.

use ndarray::Array2;

use crate::tracker::rect::{Rect, centroid_distance};

/// How far apart a track and a detection are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssociationMetric {
    /// Euclidean distance between box centroids, in pixels.
    #[default]
    Centroid,
    /// `1 - IoU` of the two boxes.
    Overlap,
}

/// How pairs are committed once the cost matrix is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignmentStrategy {
    /// Repeatedly commit the globally cheapest remaining pair.
    #[default]
    Greedy,
    /// Minimum total cost over all pairs (Jonker-Volgenant).
    Optimal,
}

/// Compute the cost matrix between track boxes (rows) and detection boxes (columns).
pub fn cost_matrix(
    track_boxes: &[Rect],
    det_boxes: &[Rect],
    metric: AssociationMetric,
) -> Array2<f32> {
    let mut dists = Array2::zeros((track_boxes.len(), det_boxes.len()));
    for (i, t) in track_boxes.iter().enumerate() {
        for (j, d) in det_boxes.iter().enumerate() {
            dists[[i, j]] = match metric {
                AssociationMetric::Centroid => centroid_distance(t, d),
                AssociationMetric::Overlap => 1.0 - t.iou(d),
            };
        }
    }
    dists
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

impl AssignmentResult {
    fn from_matches(matches: Vec<(usize, usize)>, num_rows: usize, num_cols: usize) -> Self {
        let mut row_used = vec![false; num_rows];
        let mut col_used = vec![false; num_cols];
        for &(row, col) in &matches {
            row_used[row] = true;
            col_used[col] = true;
        }
        Self {
            matches,
            unmatched_tracks: (0..num_rows).filter(|&i| !row_used[i]).collect(),
            unmatched_detections: (0..num_cols).filter(|&j| !col_used[j]).collect(),
        }
    }
}

/// Assign rows to columns with the given strategy. No cost threshold is applied:
/// `min(rows, cols)` pairs are always produced.
pub fn assign(cost_matrix: &Array2<f32>, strategy: AssignmentStrategy) -> AssignmentResult {
    match strategy {
        AssignmentStrategy::Greedy => greedy_assignment(cost_matrix),
        AssignmentStrategy::Optimal => linear_assignment(cost_matrix),
    }
}

/// Nearest-first greedy assignment.
///
/// Pairs are visited in increasing cost; ties go to the lower row, then the
/// lower column. A pair is committed when neither its row nor its column has
/// been taken. Every row or column is still paired when some costs are NaN.
pub fn greedy_assignment(cost_matrix: &Array2<f32>) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    let mut pairs: Vec<(f32, usize, usize)> = cost_matrix
        .indexed_iter()
        .map(|((i, j), &cost)| (cost, i, j))
        .collect();
    // NaN costs from malformed boxes sort after every finite cost.
    pairs.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut row_used = vec![false; num_rows];
    let mut col_used = vec![false; num_cols];
    let mut matches = Vec::with_capacity(num_rows.min(num_cols));

    for (_, row, col) in pairs {
        if matches.len() == num_rows.min(num_cols) {
            break;
        }
        if row_used[row] || col_used[col] {
            continue;
        }
        row_used[row] = true;
        col_used[col] = true;
        matches.push((row, col));
    }

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}

/// Globally optimal assignment via `lapjv` on a square, padded matrix.
///
/// Falls back to greedy assignment when the matrix holds non-finite costs
/// (NaN or infinite box coordinates) or the solver rejects it.
pub fn linear_assignment(cost_matrix: &Array2<f32>) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult::from_matches(vec![], num_rows, num_cols);
    }
    if cost_matrix.iter().any(|c| !c.is_finite()) {
        log::warn!("non-finite assignment costs, using greedy assignment");
        return greedy_assignment(cost_matrix);
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);

    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]] as f64;
        }
    }

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            let matches = row_to_col
                .iter()
                .enumerate()
                .filter(|&(row, &col)| row < num_rows && col < num_cols)
                .map(|(row, &col)| (row, col))
                .collect();
            AssignmentResult::from_matches(matches, num_rows, num_cols)
        }
        Err(err) => {
            log::warn!("optimal assignment failed ({err:?}), using greedy assignment");
            greedy_assignment(cost_matrix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn square(cx: f32, cy: f32) -> Rect {
        Rect::from_center(cx, cy, 2.0, 2.0)
    }

    #[test]
    fn test_greedy_is_nearest_first() {
        let tracks = [square(0.0, 0.0), square(10.0, 10.0)];
        let dets = [square(9.0, 9.0), square(1.0, 1.0)];
        let costs = cost_matrix(&tracks, &dets, AssociationMetric::Centroid);

        let result = greedy_assignment(&costs);
        assert_eq!(result.matches, vec![(0, 1), (1, 0)]);
        assert!(result.unmatched_tracks.is_empty());
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_greedy_differs_from_optimal() {
        // Greedy takes the 1.0 pair first and is left with 10.0.
        let costs = array![[1.0_f32, 2.0], [2.0, 10.0]];

        let greedy = greedy_assignment(&costs);
        assert_eq!(greedy.matches, vec![(0, 0), (1, 1)]);

        let optimal = linear_assignment(&costs);
        let mut matches = optimal.matches.clone();
        matches.sort();
        assert_eq!(matches, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_more_detections_than_tracks() {
        let costs = array![[5.0_f32, 1.0, 3.0]];
        for strategy in [AssignmentStrategy::Greedy, AssignmentStrategy::Optimal] {
            let result = assign(&costs, strategy);
            assert_eq!(result.matches, vec![(0, 1)]);
            assert_eq!(result.unmatched_detections, vec![0, 2]);
            assert!(result.unmatched_tracks.is_empty());
        }
    }

    #[test]
    fn test_more_tracks_than_detections() {
        let costs = array![[4.0_f32], [0.5], [2.0]];
        let result = greedy_assignment(&costs);
        assert_eq!(result.matches, vec![(1, 0)]);
        assert_eq!(result.unmatched_tracks, vec![0, 2]);
    }

    #[test]
    fn test_empty_matrices() {
        let no_tracks = Array2::<f32>::zeros((0, 2));
        let result = assign(&no_tracks, AssignmentStrategy::Optimal);
        assert_eq!(result.unmatched_detections, vec![0, 1]);

        let no_dets = Array2::<f32>::zeros((3, 0));
        let result = assign(&no_dets, AssignmentStrategy::Greedy);
        assert_eq!(result.unmatched_tracks, vec![0, 1, 2]);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_overlap_metric() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let far = Rect::new(50.0, 50.0, 10.0, 10.0);
        let costs = cost_matrix(&[a], &[a, far], AssociationMetric::Overlap);
        assert!(costs[[0, 0]].abs() < 1e-6);
        assert_eq!(costs[[0, 1]], 1.0);
    }

    #[test]
    fn test_greedy_tolerates_nan_costs() {
        let n = 40;
        let costs = Array2::from_shape_fn((n, n), |(i, j)| {
            if (i * 7 + j * 3) % 5 == 0 {
                f32::NAN
            } else {
                ((i * 31 + j * 17) % 23) as f32
            }
        });

        let result = greedy_assignment(&costs);
        assert_eq!(result.matches.len(), n);
        assert!(result.unmatched_tracks.is_empty());
        assert!(result.unmatched_detections.is_empty());

        let mut rows: Vec<usize> = result.matches.iter().map(|&(r, _)| r).collect();
        let mut cols: Vec<usize> = result.matches.iter().map(|&(_, c)| c).collect();
        rows.sort();
        cols.sort();
        assert_eq!(rows, (0..n).collect::<Vec<_>>());
        assert_eq!(cols, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn test_nan_cost_loses_to_finite_cost() {
        let costs = array![[f32::NAN, 8.0], [3.0, f32::NAN]];
        let result = greedy_assignment(&costs);
        assert_eq!(result.matches, vec![(1, 0), (0, 1)]);

        let result = assign(&costs, AssignmentStrategy::Optimal);
        assert_eq!(result.matches, vec![(1, 0), (0, 1)]);
    }
}
