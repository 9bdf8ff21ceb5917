//! Image processing: decode once, write a thumbnail and a full-size view.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image` crate; HEIC through an external converter |
//! | **Full view** | Lanczos3 resize, bounded longest edge |
//! | **Thumbnail** | fit or `resize_to_fill` + `unsharpen` |
//! | **Encode** | JPEG or AVIF (rav1e) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining config + backend

pub mod backend;
pub mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, Rendered};
pub use operations::{RenderConfig, plan_render, render};
pub use params::{FullParams, Quality, RenderParams, Sharpening, ThumbnailParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
