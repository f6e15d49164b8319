//! Category id to label mapping of a loaded model.
//!
use std::{collections::HashMap, fs, path::Path};

use thiserror::Error;

/// Vocabulary of the COCO-trained YOLOv5 checkpoints, indexed by category id.
pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// A category id produced by the model has no label.
///
/// Usually means the weights and the label file do not belong together.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("category id {0} has no entry in the label map")]
pub struct LookupError(pub u32);

#[derive(Debug, Error)]
pub enum LabelFileError {
    #[error("failed to read label file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {0} of the label file is blank")]
    BlankLine(usize),
    #[error("label file contains no labels")]
    NoLabels,
}

/// Read-only mapping from category id to human-readable label.
///
/// The mapping does not need to be injective: several ids may share a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: HashMap<u32, String>,
}

impl LabelMap {
    pub fn new(labels: HashMap<u32, String>) -> Self {
        Self { labels }
    }

    /// Labels of the 80 COCO classes.
    pub fn coco() -> Self {
        COCO_LABELS.iter().copied().enumerate().map(|(id, label)| (id as u32, label)).collect()
    }

    /// Parse one label per line, the line index being the category id.
    pub fn from_lines(text: &str) -> Result<Self, LabelFileError> {
        let mut labels = HashMap::new();
        for (index, line) in text.lines().enumerate() {
            let label = line.trim();
            if label.is_empty() {
                return Err(LabelFileError::BlankLine(index + 1));
            }
            labels.insert(index as u32, label.to_owned());
        }

        if labels.is_empty() {
            return Err(LabelFileError::NoLabels);
        }

        Ok(Self { labels })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelFileError> {
        let text = fs::read_to_string(path)?;
        Self::from_lines(&text)
    }

    pub fn get(&self, category_id: u32) -> Result<&str, LookupError> {
        self.labels
            .get(&category_id)
            .map(String::as_str)
            .ok_or(LookupError(category_id))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for LabelMap {
    fn from_iter<T: IntoIterator<Item = (u32, S)>>(iter: T) -> Self {
        Self {
            labels: iter.into_iter().map(|(id, label)| (id, label.into())).collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn coco_vocabulary() {
        let labels = LabelMap::coco();
        assert_eq!(labels.len(), 80);
        assert_eq!(labels.get(0), Ok("person"));
        assert_eq!(labels.get(79), Ok("toothbrush"));
        assert_eq!(labels.get(80), Err(LookupError(80)));
    }

    #[test]
    fn parse_label_lines() {
        let labels = LabelMap::from_lines("cat\n dog \nbird\n").unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get(1), Ok("dog"));
        assert_eq!(labels.get(2), Ok("bird"));
    }

    #[test]
    fn reject_blank_line() {
        let err = LabelMap::from_lines("cat\n\nbird").unwrap_err();
        assert!(matches!(err, LabelFileError::BlankLine(2)));
    }

    #[test]
    fn reject_empty_file() {
        assert!(matches!(
            LabelMap::from_lines(""),
            Err(LabelFileError::NoLabels)
        ));
    }
}
