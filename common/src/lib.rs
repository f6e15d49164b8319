//! Common code shared between `detect_server` and `snap_client`.
pub mod aggregate;
pub mod config;
pub mod labels;
pub mod protocol;

pub use aggregate::{count_by_label, count_detections, CountRow, CountTable};
pub use config::{ConfigError, DetectionConfig};
pub use labels::{LabelMap, LookupError};
pub use protocol::{DetectResponse, Detection, LabeledDetection};

/// Error type.
pub type Error = Box<dyn std::error::Error>;
