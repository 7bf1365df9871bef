//! # bambu3mf
//!
//! Reads 3MF packages written by filament-painting slicers and turns them
//! into triangle meshes with resolved colors.
//!
//! A package is a ZIP container. Painted packages carry one model document per
//! object under `3D/Objects/` whose triangles hold a `paint_color` code, plus
//! a `Metadata/slice_info.config` document that maps filament indices to
//! `#RRGGBB` colors. Plain packages carry a single `3D/3dmodel.model` colored
//! through `<colorgroup>` resources.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Paint code decoding with multi-filament blending
//! - Material mode: a merged palette plus a palette index per face
//! - Vertex mode: per-vertex colors averaged over adjacent painted faces
//! - Bounding box of the painted region for colored/uncolored splitting
//!
//! ## Example
//!
//! ```no_run
//! use bambu3mf::{ImportConfig, import_path};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let result = import_path("painted.3mf", &ImportConfig::default())?;
//! println!(
//!     "{} objects, {} filaments",
//!     result.objects.len(),
//!     result.package.filament_colors.len()
//! );
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod color;
pub mod error;
pub mod importer;
pub mod mesh_ops;
pub mod model;
pub mod opc;
pub mod parser;
pub mod resolver;

pub use color::{FilamentColors, Rgb, blend, decode_paint_code};
pub use error::{Error, Result};
pub use importer::{
    CancelToken, ColoredObject, ImportConfig, ImportResult, MetadataPolicy, ObjectSink,
    PackageInfo, import, import_into, import_path,
};
pub use mesh_ops::{BoundingBox, RegionSplit};
pub use model::{PackageLayout, ParsedModel, ParsedObject, Triangle, Vertex3};
pub use opc::Package;
pub use parser::{parse_model, parse_slice_info};
pub use resolver::{ColorAssignment, ColorMode, ColorResolver, ColorSource, Palette};
