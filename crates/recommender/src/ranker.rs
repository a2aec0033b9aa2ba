//! Ranking and selection.
//!
//! Orders candidates by distance score, breaks ties by final score, keeps the
//! top `k` and only then drops anything outside the acceptance radius.

use std::cmp::Ordering;

use common::Location;
use serde::Serialize;
use tracing::debug;

/// A restroom scored against one requester coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredLocation {
    pub location: Location,
    pub distance_m: f64,
    pub distance_score: u8,
    /// `None` when every covering area is still unpopulated.
    pub congestion_score: Option<f64>,
    pub final_score: f64,
}

impl ScoredLocation {
    /// Final score is the distance score minus the congestion penalty; an
    /// unknown congestion score carries no penalty.
    pub fn new(location: Location, distance_m: f64, distance_score: u8, congestion_score: Option<f64>) -> Self {
        let final_score = f64::from(distance_score) - congestion_score.unwrap_or(0.0);
        Self {
            location,
            distance_m,
            distance_score,
            congestion_score,
            final_score,
        }
    }
}

/// Ranked result for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    /// Non-empty, best first.
    Found(Vec<ScoredLocation>),
    /// No top-ranked candidate lies within the acceptance radius.
    NoneInRange,
}

impl Recommendation {
    pub fn candidates(&self) -> &[ScoredLocation] {
        match self {
            Recommendation::Found(list) => list,
            Recommendation::NoneInRange => &[],
        }
    }
}

fn by_distance_then_final(a: &ScoredLocation, b: &ScoredLocation) -> Ordering {
    b.distance_score
        .cmp(&a.distance_score)
        .then_with(|| b.final_score.total_cmp(&a.final_score))
}

/// Rank candidates already scored against one requester.
///
/// The sort is stable, so candidates with equal keys keep their input order.
/// The radius filter uses each candidate's stored `distance_m`.
pub fn rank(
    mut candidates: Vec<ScoredLocation>,
    acceptance_radius_m: f64,
    k: usize,
) -> Recommendation {
    candidates.sort_by(by_distance_then_final);
    candidates.truncate(k);

    let picked: Vec<ScoredLocation> = candidates
        .into_iter()
        .filter(|c| {
            let within = c.distance_m <= acceptance_radius_m;
            if !within {
                debug!(
                    "{}: outside acceptance radius ({:.0}m > {:.0}m)",
                    c.location.name, c.distance_m, acceptance_radius_m
                );
            }
            within
        })
        .collect();

    if picked.is_empty() {
        Recommendation::NoneInRange
    } else {
        Recommendation::Found(picked)
    }
}
