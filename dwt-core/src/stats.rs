use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;

use crate::domain::{Entry, date_prefix, round_weight};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: String,
    pub weight: f64,
}

/// Summary of one dog's weight history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightStats {
    pub count: usize,
    pub first: Observation,
    pub latest: Observation,
    pub min: f64,
    pub max: f64,
    /// `latest - first`, in kg.
    pub change: f64,
    /// Least-squares slope in kg/day.
    pub trend_per_day: Option<f64>,
}

fn day_number(date: &str) -> Option<i32> {
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(date_prefix(date), fmt)
        .ok()
        .map(Date::to_julian_day)
}

fn slope(points: &[(f64, f64)]) -> Option<f64> {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (x, y) in points {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x) * (x - mean_x);
    }
    // zero spread means every point sits on the same day
    (sxx > 0.0).then(|| sxy / sxx)
}

impl WeightStats {
    /// `None` for an empty slice. Order of `entries` does not matter.
    pub fn from_entries(entries: &[Entry]) -> Option<Self> {
        let mut sorted: Vec<&Entry> = entries.iter().collect();
        sorted.sort_by(|a, b| a.date.cmp(&b.date));
        let first = sorted.first()?;
        let latest = sorted.last()?;

        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for e in &sorted {
            min = min.min(e.weight);
            max = max.max(e.weight);
        }

        let points: Vec<(f64, f64)> = sorted
            .iter()
            .filter_map(|e| day_number(&e.date).map(|d| (f64::from(d), e.weight)))
            .collect();

        Some(Self {
            count: sorted.len(),
            first: Observation {
                date: first.date.clone(),
                weight: first.weight,
            },
            latest: Observation {
                date: latest.date.clone(),
                weight: latest.weight,
            },
            min,
            max,
            change: round_weight(latest.weight - first.weight),
            trend_per_day: if points.is_empty() { None } else { slope(&points) },
        })
    }
}
