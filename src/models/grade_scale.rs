use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeThreshold {
    pub label: String,
    pub min_percentage: f64,
}

/// Letter grade thresholds for a course, in the order the user entered them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeScale(pub Vec<GradeThreshold>);

impl GradeScale {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self(
            entries
                .into_iter()
                .map(|(label, min_percentage)| GradeThreshold {
                    label: label.into(),
                    min_percentage,
                })
                .collect(),
        )
    }

    /// The A..F plus/minus scale offered when a course has none configured.
    pub fn standard() -> Self {
        Self::new([
            ("A", 93.0),
            ("A-", 90.0),
            ("B+", 87.0),
            ("B", 83.0),
            ("B-", 80.0),
            ("C+", 77.0),
            ("C", 73.0),
            ("C-", 70.0),
            ("D+", 67.0),
            ("D", 63.0),
            ("D-", 60.0),
            ("F", 0.0),
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[GradeThreshold] {
        &self.0
    }

    /// Entries ordered by threshold, highest first. Equal thresholds keep entry order.
    pub fn sorted_desc(&self) -> Vec<&GradeThreshold> {
        let mut sorted: Vec<&GradeThreshold> = self.0.iter().collect();
        sorted.sort_by(|a, b| b.min_percentage.total_cmp(&a.min_percentage));
        sorted
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for entry in &self.0 {
            let label = entry.label.trim();
            if label.is_empty() {
                return Err("grade scale labels must not be blank".to_string());
            }
            if !entry.min_percentage.is_finite() {
                return Err(format!("threshold for {} must be a finite number", label));
            }
            if !seen.insert(label.to_string()) {
                return Err(format!("duplicate grade label: {}", label));
            }
        }
        Ok(())
    }
}
