use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

/// One aligned window of sensor observations. Replaced wholesale on each
/// successful poll; the four vectors are parallel-indexed and always share
/// the same length (or are all empty).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub timestamps: Vec<DateTime<Tz>>,
    pub luminosity: Vec<f64>,
    pub humidity: Vec<f64>,
    pub temperature: Vec<f64>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            timestamps: Vec::new(),
            luminosity: Vec::new(),
            humidity: Vec::new(),
            temperature: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
