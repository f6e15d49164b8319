//! Client uploading photos to `detect_server` and printing the detected categories.
pub mod upload;
