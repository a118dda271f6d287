//! Application layer: colouring, rendering and analysis use cases
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod color;
pub mod error;
pub mod error_ext;
pub mod render;
pub mod services;

pub use color::{ColorError, ColorMode, NodeColorizer, NodeStyle, RegionGroup};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use render::{OutputFormat, TreeRenderer};
