//! Annotation engine for manga pages: mask strokes for inpainting, selection
//! regions for OCR, and translated text overlays, all kept consistent across
//! zoom, pan, container resizes, and background replacement.

pub mod config;
pub mod editor;
pub mod error;
pub mod gate;
pub mod history;
pub mod mask;
pub mod overlay;
pub mod raster;
pub mod scene;
pub mod selection;
pub mod services;
pub mod tasks;
pub mod text_layout;
pub mod transform;
pub mod viewport;

pub use editor::{Completion, Editor, Tool};
pub use error::{AnnotateError, ErrorKind, Result};
pub use services::{Collaborators, HttpServices};
