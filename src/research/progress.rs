//! Progress tracking for a single research run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Called after every completed query. Invoked synchronously, in completion order.
pub type ProgressCallback = Arc<dyn Fn(&ResearchProgress) + Send + Sync>;

/// Snapshot of how far a run has come.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchProgress {
    pub current_depth: usize,
    pub total_depth: usize,
    pub current_breadth: usize,
    pub total_breadth: usize,
    pub total_queries: usize,
    pub completed_queries: usize,
    pub current_query: Option<String>,
}

impl ResearchProgress {
    pub fn new(depth: usize, breadth: usize) -> Self {
        Self {
            current_depth: depth,
            total_depth: depth,
            current_breadth: breadth,
            total_breadth: breadth,
            total_queries: total_queries_for(depth, breadth),
            completed_queries: 0,
            current_query: None,
        }
    }

    /// Count one finished query. Never exceeds `total_queries`.
    pub fn record_completed(&mut self, query: &str, depth: usize, breadth: usize) {
        self.completed_queries = (self.completed_queries + 1).min(self.total_queries);
        self.current_query = Some(query.to_string());
        self.current_depth = depth;
        self.current_breadth = breadth;
    }

    /// Rounded percentage of finished queries; 0 when nothing is planned.
    pub fn percent(&self) -> u8 {
        if self.total_queries == 0 {
            return 0;
        }
        let ratio = self.completed_queries as f64 / self.total_queries as f64;
        (ratio * 100.0).round().min(100.0) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total_queries > 0 && self.completed_queries >= self.total_queries
    }
}

/// Expected query count: breadth halves (rounding up) at each of `depth` levels.
pub fn total_queries_for(depth: usize, breadth: usize) -> usize {
    let mut total = 0;
    let mut level_breadth = breadth;
    for _ in 0..depth {
        total += level_breadth;
        level_breadth = level_breadth.div_ceil(2);
    }
    total
}
