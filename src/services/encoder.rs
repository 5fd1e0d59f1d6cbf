//! Label encoding for the categorical shipment fields.
//!
//! Codes are dense and assigned in sorted label order, so refitting on the
//! same corpus always produces the same mapping. Labels that were never seen
//! during fit resolve to [`FALLBACK_CODE`]; this is an approximation, not an
//! error.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::models::TrainingRow;

pub const FALLBACK_CODE: u32 = 0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CategoricalEncoder {
    classes: Vec<String>,
    codes: HashMap<String, u32>,
}

impl CategoricalEncoder {
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();
        Self::from(distinct.into_iter().collect::<Vec<_>>())
    }

    pub fn transform(&self, label: &str) -> u32 {
        self.lookup(label).unwrap_or(FALLBACK_CODE)
    }

    pub fn lookup(&self, label: &str) -> Option<u32> {
        self.codes.get(label).copied()
    }

    pub fn label(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Codes follow the given order; a repeated label keeps its first code.
impl From<Vec<String>> for CategoricalEncoder {
    fn from(labels: Vec<String>) -> Self {
        let mut classes = Vec::with_capacity(labels.len());
        let mut codes = HashMap::with_capacity(labels.len());
        for label in labels {
            if codes.contains_key(&label) {
                continue;
            }
            codes.insert(label.clone(), classes.len() as u32);
            classes.push(label);
        }
        Self { classes, codes }
    }
}

impl From<CategoricalEncoder> for Vec<String> {
    fn from(encoder: CategoricalEncoder) -> Self {
        encoder.classes
    }
}

/// The three independent encoders the model's features depend on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEncoders {
    pub origin: CategoricalEncoder,
    pub destination: CategoricalEncoder,
    pub status: CategoricalEncoder,
}

impl FeatureEncoders {
    pub fn fit(rows: &[TrainingRow]) -> Self {
        Self {
            origin: CategoricalEncoder::fit(rows.iter().map(|r| &r.origin)),
            destination: CategoricalEncoder::fit(rows.iter().map(|r| &r.destination)),
            status: CategoricalEncoder::fit(rows.iter().map(|r| &r.status)),
        }
    }
}
