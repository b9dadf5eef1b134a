use anyhow::{anyhow, Result};
use std::path::Path;

/// Built-in label set used by the stub classifier and the demo daemon.
/// Real deployments load the label file shipped alongside the model.
const DEFAULT_LABELS: &[&str] = &[
    "apple",
    "banana",
    "bread",
    "burger",
    "coffee",
    "eggs",
    "pasta",
    "pizza",
    "rice",
    "salad",
    "sandwich",
    "soup",
];

/// Fixed index-to-name mapping for classifier output.
///
/// The table length defines `L`, the expected score vector length. Lookups
/// past the end return `None`; the debouncer treats such frames as searching
/// rather than erroring.
#[derive(Clone, Debug)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(anyhow!("label table must not be empty"));
        }
        Ok(Self { labels })
    }

    /// Built-in demo label set.
    pub fn default_food_labels() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load a newline-delimited label file (blank lines ignored).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read label file {}: {}", path.display(), e))?;
        let labels: Vec<String> = raw
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect();
        Self::new(labels)
    }

    /// Number of known classes (`L`).
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Resolve a class index to its label.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(|s| s.as_str())
    }
}
