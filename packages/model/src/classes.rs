use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic categories the classifier distinguishes, in model output order.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TumorClass {
    Glioma,
    Meningioma,
    NoTumor,
    Pituitary,
}

/// Output index `i` of the model scores `CLASSES[i]`.
pub const CLASSES: [TumorClass; 4] = [
    TumorClass::Glioma,
    TumorClass::Meningioma,
    TumorClass::NoTumor,
    TumorClass::Pituitary,
];

impl TumorClass {
    pub fn id(&self) -> &'static str {
        match self {
            TumorClass::Glioma => "glioma",
            TumorClass::Meningioma => "meningioma",
            TumorClass::NoTumor => "no_tumor",
            TumorClass::Pituitary => "pituitary",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TumorClass::Glioma => "Glioma",
            TumorClass::Meningioma => "Meningioma",
            TumorClass::NoTumor => "No Tumor",
            TumorClass::Pituitary => "Pituitary Tumor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TumorClass::Glioma => "Starts in glial cells of brain or spine",
            TumorClass::Meningioma => "Forms on brain/spinal cord membranes",
            TumorClass::NoTumor => "No tumor detected in the scan",
            TumorClass::Pituitary => "Occurs in the pituitary gland",
        }
    }
}

impl fmt::Display for TumorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Static reference entry served by `/classifications/`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClassificationMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl From<TumorClass> for ClassificationMetadata {
    fn from(class: TumorClass) -> Self {
        Self {
            id: class.id().to_string(),
            name: class.display_name().to_string(),
            description: class.description().to_string(),
        }
    }
}

pub fn classification_metadata() -> Vec<ClassificationMetadata> {
    CLASSES.iter().copied().map(ClassificationMetadata::from).collect()
}
