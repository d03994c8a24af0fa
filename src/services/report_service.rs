use crate::models::candidate::HighFitCandidate;
use chrono::{DateTime, Utc};
use std::fmt;

/// Periodic summary of candidates at or above the high-fit threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct HighFitReport {
    pub generated_at: DateTime<Utc>,
    pub threshold: i32,
    pub candidates: Vec<HighFitCandidate>,
}

impl HighFitReport {
    /// Keeps only rows meeting the threshold; `None` when nothing qualifies.
    pub fn build(
        threshold: i32,
        candidates: Vec<HighFitCandidate>,
        generated_at: DateTime<Utc>,
    ) -> Option<Self> {
        let candidates: Vec<_> = candidates
            .into_iter()
            .filter(|c| c.fit_score >= threshold)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(Self {
            generated_at,
            threshold,
            candidates,
        })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl fmt::Display for HighFitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "High-fit candidates report")?;
        writeln!(f, "Date: {}", self.generated_at.to_rfc3339())?;
        writeln!(f, "Candidates with score >= {}:", self.threshold)?;
        for c in &self.candidates {
            writeln!(f, "  - Name: {}, Email: {}, Score: {}", c.name, c.email, c.fit_score)?;
        }
        Ok(())
    }
}
