//! Pollution source estimator
//!
//! Infers the most probable emission point from georeferenced severity data.
//!
//! # Policy
//!
//! 1. No scored, geolocated rows: the estimate is empty and downstream
//!    stages must stop with an "insufficient data" warning.
//! 2. Fewer rows than clusters: the coordinate of the highest-severity row
//!    (first one on ties).
//! 3. Otherwise: rows are partitioned into `k` spatial clusters on
//!    latitude/longitude only, and the centroid of the cluster with the
//!    highest mean severity is returned.
//!
//! Both non-empty cases round the coordinates to five decimal places.
//!
//! Clustering is behind the [`ClusterAssigner`] trait so any deterministic
//! centroid-based algorithm can be substituted. [`KMeans`] is the default:
//! seeded k-means++ initialisation followed by Lloyd iterations.

use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{defaults, ClusterConfig};
use crate::core_types::observation::Column;
use crate::core_types::spatial::GeoPoint;
use crate::core_types::table::ObservationTable;
use crate::error::PipelineResult;

const STAGE: &str = "source";

/// Estimated source location; both coordinates are `None` when there was not
/// enough data to estimate one
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceEstimate {
    pub source_latitude: Option<f64>,
    pub source_longitude: Option<f64>,
}

impl SourceEstimate {
    /// Estimate at a known location
    pub fn at(point: GeoPoint) -> Self {
        SourceEstimate {
            source_latitude: Some(point.latitude),
            source_longitude: Some(point.longitude),
        }
    }

    /// Empty estimate signalling insufficient data
    pub const fn insufficient() -> Self {
        SourceEstimate {
            source_latitude: None,
            source_longitude: None,
        }
    }

    /// Location, if both coordinates are known
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.source_latitude, self.source_longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.location().is_none()
    }
}

/// Result of partitioning points into clusters
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster id for every input point, in input order
    pub labels: Vec<usize>,
    /// Centroid of every cluster, indexed by cluster id
    pub centroids: Vec<Point2<f64>>,
}

/// Capability to partition 2D points into `k` clusters
///
/// Implementations must be deterministic: the same points and `k` always
/// produce the same clustering.
pub trait ClusterAssigner: Send + Sync {
    /// Partition `points` into `k` clusters
    ///
    /// Callers guarantee `points.len() >= k` and `k >= 1`.
    fn assign(&self, points: &[Point2<f64>], k: usize) -> Clustering;
}

/// Seeded k-means (k-means++ initialisation, Lloyd refinement)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeans {
    pub seed: u64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl KMeans {
    pub fn from_config(config: &ClusterConfig) -> Self {
        KMeans {
            seed: config.seed,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }

    /// k-means++ seeding: first centre uniform, later centres drawn with
    /// probability proportional to squared distance from the nearest centre
    fn initial_centroids(&self, points: &[Point2<f64>], k: usize) -> Vec<Point2<f64>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = Vec::with_capacity(k);
        centroids.push(points[rng.random_range(0..points.len())]);

        while centroids.len() < k {
            let weights: Vec<f64> = points
                .iter()
                .map(|p| nearest(p, &centroids).1)
                .collect();
            let total: f64 = weights.iter().sum();

            let next = if total > 0.0 {
                let mut target = rng.random::<f64>() * total;
                let mut chosen = points.len() - 1;
                for (idx, w) in weights.iter().enumerate() {
                    if *w > 0.0 && target < *w {
                        chosen = idx;
                        break;
                    }
                    target -= w;
                }
                points[chosen]
            } else {
                // Every point coincides with a centre already; duplicate one
                points[centroids.len() % points.len()]
            };
            centroids.push(next);
        }

        centroids
    }
}

impl Default for KMeans {
    fn default() -> Self {
        KMeans::from_config(&ClusterConfig::default())
    }
}

impl ClusterAssigner for KMeans {
    fn assign(&self, points: &[Point2<f64>], k: usize) -> Clustering {
        let mut centroids = self.initial_centroids(points, k);
        let mut labels = vec![0; points.len()];

        for iteration in 0..self.max_iterations.max(1) {
            for (label, p) in labels.iter_mut().zip(points) {
                *label = nearest(p, &centroids).0;
            }

            let mut sums = vec![(0.0, 0.0, 0usize); k];
            for (label, p) in labels.iter().zip(points) {
                let entry = &mut sums[*label];
                entry.0 += p.x;
                entry.1 += p.y;
                entry.2 += 1;
            }

            let mut shift: f64 = 0.0;
            for (centroid, (sx, sy, n)) in centroids.iter_mut().zip(sums) {
                // Empty clusters keep their previous centre
                if n == 0 {
                    continue;
                }
                let updated = Point2::new(sx / n as f64, sy / n as f64);
                shift = shift.max(nalgebra::distance(centroid, &updated));
                *centroid = updated;
            }

            if shift <= self.tolerance {
                debug!(iteration, "k-means converged");
                break;
            }
        }

        for (label, p) in labels.iter_mut().zip(points) {
            *label = nearest(p, &centroids).0;
        }

        Clustering { labels, centroids }
    }
}

/// Index of and squared distance to the closest centre (first on ties)
fn nearest(p: &Point2<f64>, centroids: &[Point2<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(idx, c)| (idx, nalgebra::distance_squared(p, c)))
        .fold((0, f64::INFINITY), |best, cand| {
            if cand.1 < best.1 {
                cand
            } else {
                best
            }
        })
}

/// Estimate the pollution source with the default k-means assigner
///
/// # Errors
/// Returns [`crate::PipelineError::MissingColumn`] if coordinates or the
/// severity index are absent.
pub fn estimate_pollution_source(
    table: &ObservationTable,
    config: &ClusterConfig,
) -> PipelineResult<SourceEstimate> {
    estimate_with(table, config.clusters, &KMeans::from_config(config))
}

/// Estimate the pollution source with a caller-supplied cluster assigner
///
/// # Errors
/// Returns [`crate::PipelineError::MissingColumn`] if coordinates or the
/// severity index are absent.
pub fn estimate_with<A: ClusterAssigner + ?Sized>(
    table: &ObservationTable,
    clusters: usize,
    assigner: &A,
) -> PipelineResult<SourceEstimate> {
    table.require(STAGE, &[Column::Latitude, Column::Longitude, Column::SeverityIndex])?;

    let rows: Vec<(GeoPoint, f64)> = table
        .iter()
        .filter_map(|r| match (r.location(), r.severity_index) {
            (Some(loc), Some(sev)) if sev.is_finite() => Some((loc, sev)),
            _ => None,
        })
        .collect();

    if rows.is_empty() {
        warn!("No geolocated severity data, source cannot be estimated");
        return Ok(SourceEstimate::insufficient());
    }

    let k = clusters.max(1);
    if rows.len() < k {
        let (location, severity) = rows
            .iter()
            .copied()
            .fold(rows[0], |best, cand| if cand.1 > best.1 { cand } else { best });
        debug!(
            rows = rows.len(),
            severity, "Too few rows to cluster, using highest-severity location"
        );
        return Ok(SourceEstimate::at(location.rounded(defaults::SOURCE_DECIMALS)));
    }

    let points: Vec<Point2<f64>> = rows.iter().map(|(loc, _)| (*loc).into()).collect();
    let clustering = assigner.assign(&points, k);

    let mut totals = vec![(0.0, 0usize); clustering.centroids.len()];
    for (label, (_, severity)) in clustering.labels.iter().zip(&rows) {
        let entry = &mut totals[*label];
        entry.0 += severity;
        entry.1 += 1;
    }

    let hottest = totals
        .iter()
        .enumerate()
        .filter(|(_, (_, n))| *n > 0)
        .map(|(idx, (sum, n))| (idx, sum / *n as f64))
        .fold(None, |best: Option<(usize, f64)>, cand| match best {
            Some(b) if b.1 >= cand.1 => Some(b),
            _ => Some(cand),
        });

    let Some((cluster, mean_severity)) = hottest else {
        return Ok(SourceEstimate::insufficient());
    };

    let centroid = GeoPoint::from(clustering.centroids[cluster]);
    debug!(
        rows = rows.len(),
        cluster,
        mean_severity,
        latitude = centroid.latitude,
        longitude = centroid.longitude,
        "Source estimated from highest-severity cluster"
    );

    Ok(SourceEstimate::at(centroid.rounded(defaults::SOURCE_DECIMALS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::observation::Observation;
    use crate::error::PipelineError;

    fn scored(rows: &[(f64, f64, f64)]) -> ObservationTable {
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, &(lat, lon, sev))| {
                let mut r =
                    Observation::new("S", format!("City{i}"), Some(1.0), Some(1.0), Some(1.0))
                        .with_location(lat, lon);
                r.severity_index = Some(sev);
                r
            })
            .collect();
        ObservationTable::with_measurements(records).extend_with(&[Column::SeverityIndex], |_| {})
    }

    #[test]
    fn test_empty_table_gives_insufficient_estimate() {
        let table = scored(&[]);
        let estimate = estimate_pollution_source(&table, &ClusterConfig::default()).unwrap();
        assert!(estimate.is_insufficient());
        assert_eq!(estimate, SourceEstimate::insufficient());
    }

    #[test]
    fn test_rows_without_coordinates_are_ignored() {
        let mut table = scored(&[(28.6, 77.2, 0.9)]);
        table = table.extend_with(&[], |r| r.latitude = None);
        let estimate = estimate_pollution_source(&table, &ClusterConfig::default()).unwrap();
        assert!(estimate.is_insufficient());
    }

    #[test]
    fn test_single_row_returns_its_location() {
        let table = scored(&[(28.6139123, 77.2090078, 0.4)]);
        let estimate = estimate_pollution_source(&table, &ClusterConfig::default()).unwrap();
        assert_eq!(estimate.source_latitude, Some(28.61391));
        assert_eq!(estimate.source_longitude, Some(77.20901));
    }

    #[test]
    fn test_two_rows_return_highest_severity_location() {
        let table = scored(&[(19.07, 72.87, 0.3), (22.57, 88.36, 0.8)]);
        let estimate = estimate_pollution_source(&table, &ClusterConfig::default()).unwrap();
        assert_eq!(estimate.location(), Some(GeoPoint::new(22.57, 88.36)));
    }

    #[test]
    fn test_three_rows_pick_a_cluster_centroid() {
        let table = scored(&[(10.0, 10.0, 0.1), (20.0, 20.0, 0.9), (30.0, 30.0, 0.5)]);
        let estimate = estimate_pollution_source(&table, &ClusterConfig::default()).unwrap();
        // With k = 3 and three distinct points each point is its own cluster
        assert_eq!(estimate.location(), Some(GeoPoint::new(20.0, 20.0)));
    }

    #[test]
    fn test_clustered_estimate_is_hottest_centroid() {
        let table = scored(&[
            (10.0, 10.0, 0.1),
            (10.1, 10.1, 0.2),
            (20.0, 20.0, 0.9),
            (20.2, 20.2, 0.7),
            (30.0, 30.0, 0.4),
            (30.1, 30.1, 0.4),
        ]);
        let config = ClusterConfig::default();
        let estimate = estimate_pollution_source(&table, &config).unwrap();
        assert_eq!(estimate.location(), Some(GeoPoint::new(20.1, 20.1)));

        // The returned point must be one of the clustering's centroids
        let points: Vec<Point2<f64>> = table
            .iter()
            .filter_map(|r| r.location())
            .map(Into::into)
            .collect();
        let clustering = KMeans::from_config(&config).assign(&points, 3);
        assert!(clustering
            .centroids
            .iter()
            .any(|c| GeoPoint::from(*c).rounded(5) == estimate.location().unwrap()));
    }

    #[test]
    fn test_kmeans_is_deterministic() {
        let points: Vec<Point2<f64>> = (0..30)
            .map(|i| Point2::new(f64::from(i % 7) * 1.5, f64::from(i % 5) * 2.0))
            .collect();
        let kmeans = KMeans::default();
        assert_eq!(kmeans.assign(&points, 3), kmeans.assign(&points, 3));
    }

    #[test]
    fn test_kmeans_handles_duplicate_points() {
        let points = vec![Point2::new(1.0, 1.0); 4];
        let clustering = KMeans::default().assign(&points, 3);
        assert_eq!(clustering.labels.len(), 4);
        assert_eq!(clustering.centroids.len(), 3);
        assert!(clustering
            .centroids
            .iter()
            .all(|c| (c.x - 1.0).abs() < 1e-12 && (c.y - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_missing_coordinates_column_is_an_error() {
        let table = ObservationTable::new(
            [Column::State, Column::City, Column::SeverityIndex],
            Vec::new(),
        );
        let err = estimate_pollution_source(&table, &ClusterConfig::default()).unwrap_err();
        assert_eq!(err, PipelineError::missing_column("source", Column::Latitude));
    }

    /// Assigner that puts every point in cluster 0
    struct SingleCluster;

    impl ClusterAssigner for SingleCluster {
        fn assign(&self, points: &[Point2<f64>], k: usize) -> Clustering {
            let n = points.len() as f64;
            let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
            let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
            let mut centroids = vec![Point2::new(cx, cy)];
            centroids.resize(k, Point2::new(0.0, 0.0));
            Clustering {
                labels: vec![0; points.len()],
                centroids,
            }
        }
    }

    #[test]
    fn test_custom_assigner_is_used() {
        let table = scored(&[(0.0, 0.0, 0.5), (2.0, 4.0, 0.5), (4.0, 8.0, 0.5)]);
        let estimate = estimate_with(&table, 3, &SingleCluster).unwrap();
        assert_eq!(estimate.location(), Some(GeoPoint::new(2.0, 4.0)));
    }
}
