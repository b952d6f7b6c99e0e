//! Class table mapping model output positions to labels.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{FruitscanError, Result};

/// A single (fruit, condition) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabel {
    pub fruit: String,
    pub condition: String,
}

impl ClassLabel {
    pub fn new(fruit: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            fruit: fruit.into(),
            condition: condition.into(),
        }
    }
}

/// Labels the bundled leaf-disease model was trained with, in output order.
const BUILTIN_CLASSES: [(&str, &str); 8] = [
    ("Apple", "scab"),
    ("Apple", "Black Rot"),
    ("Apple", "Cedar rust"),
    ("Apple", "Healthy"),
    ("Cherry", "Powdery Mildew"),
    ("Cherry", "Healthy"),
    ("Strawberry", "Leaf Scorch"),
    ("Strawberry", "Healthy"),
];

/// Ordered labels, index-aligned with the classifier's output vector.
///
/// Immutable once built. The table is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTable {
    classes: Box<[ClassLabel]>,
}

#[derive(Deserialize)]
struct LabelsFile {
    #[serde(rename = "class", default)]
    classes: Vec<ClassLabel>,
}

impl ClassTable {
    /// Build a table from labels in model output order.
    pub fn new(classes: Vec<ClassLabel>) -> Result<Self> {
        if classes.is_empty() {
            return Err(FruitscanError::Configuration(
                "class table must contain at least one class".to_string(),
            ));
        }
        if let Some((i, _)) = classes
            .iter()
            .enumerate()
            .find(|(_, c)| c.fruit.trim().is_empty() || c.condition.trim().is_empty())
        {
            return Err(FruitscanError::Configuration(format!(
                "class {i} has an empty fruit or condition name"
            )));
        }
        Ok(Self {
            classes: classes.into_boxed_slice(),
        })
    }

    /// The eight leaf classes of the bundled model.
    pub fn builtin() -> Self {
        Self {
            classes: BUILTIN_CLASSES
                .iter()
                .map(|(fruit, condition)| ClassLabel::new(*fruit, *condition))
                .collect(),
        }
    }

    /// Parse a labels file (`[[class]]` tables with `fruit` and `condition`).
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: LabelsFile = toml::from_str(content).map_err(|e| {
            FruitscanError::Configuration(format!("Failed to parse labels: {e}"))
        })?;
        Self::new(file.classes)
    }

    /// Load a labels file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FruitscanError::Configuration(format!("Failed to read labels file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ClassLabel> {
        self.classes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassLabel> {
        self.classes.iter()
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::builtin()
    }
}
