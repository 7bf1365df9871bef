//! Package import pipeline
//!
//! Opens a package, loads the filament colors, parses every model entry and
//! resolves the colors of every object, handing each finished object to an
//! [`ObjectSink`]. The result is a plain value: creating meshes, materials or
//! boolean cuts from it is the consumer's job.
//!
//! # Example
//!
//! ```no_run
//! use bambu3mf::{ColorMode, ImportConfig, import_path};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ImportConfig::new()
//!     .with_mode(ColorMode::Material)
//!     .with_similarity_threshold(20.0);
//! let result = import_path("painted.3mf", &config)?;
//!
//! for object in &result.objects {
//!     println!("{:?}: {} faces", object.name, object.triangles.len());
//!     if let Some(split) = object.region_split(result.bbox_padding) {
//!         println!("  colored region {:?}", split.colored);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::color::{FilamentColors, Rgb};
use crate::error::{Error, Result};
use crate::mesh_ops::{BoundingBox, RegionSplit};
use crate::model::{PackageLayout, ParsedModel, Vertex3};
use crate::opc::{Package, SLICE_INFO_PATH};
use crate::parser::{parse_model, parse_slice_info};
use crate::resolver::{
    ColorAssignment, ColorMode, ColorResolver, ColorSource, DEFAULT_SIMILARITY_THRESHOLD,
};
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default padding (millimeters) a consumer adds around the painted region
/// before cutting out the uncolored region
pub const DEFAULT_BBOX_PADDING: f64 = 0.1;

/// Accepted similarity threshold range
pub const SIMILARITY_THRESHOLD_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// Accepted bounding box padding range in millimeters
pub const BBOX_PADDING_RANGE: std::ops::RangeInclusive<f64> = 0.0..=10.0;

/// What to do when the slicing metadata is malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataPolicy {
    /// Abort the import with [`Error::MalformedMetadata`]
    #[default]
    Strict,
    /// Log a warning and continue with no filament colors, so every painted
    /// triangle resolves to the sentinel
    Lenient,
}

/// Cooperative cancellation flag shared between threads
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Import configuration
///
/// # Example
///
/// ```
/// use bambu3mf::{ColorMode, ImportConfig, MetadataPolicy};
///
/// let config = ImportConfig::new()
///     .with_mode(ColorMode::Vertex)
///     .with_metadata_policy(MetadataPolicy::Lenient);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Output mode
    pub mode: ColorMode,
    /// Palette merge distance (material mode only)
    pub similarity_threshold: f64,
    /// Padding forwarded to the consumer for the uncolored region cut
    pub bbox_padding: f64,
    /// Handling of malformed slicing metadata
    pub metadata_policy: MetadataPolicy,
    cancel: Option<CancelToken>,
    deadline: Option<Instant>,
}

impl ImportConfig {
    /// Material mode with default threshold and padding
    pub fn new() -> Self {
        Self {
            mode: ColorMode::Material,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            bbox_padding: DEFAULT_BBOX_PADDING,
            metadata_policy: MetadataPolicy::Strict,
            cancel: None,
            deadline: None,
        }
    }

    /// Set the output mode
    pub fn with_mode(mut self, mode: ColorMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the palette similarity threshold
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the bounding box padding forwarded to the consumer
    pub fn with_bbox_padding(mut self, padding: f64) -> Self {
        self.bbox_padding = padding;
        self
    }

    /// Set the malformed metadata policy
    pub fn with_metadata_policy(mut self, policy: MetadataPolicy) -> Self {
        self.metadata_policy = policy;
        self
    }

    /// Attach a cancel token checked between entries and objects
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fail with [`Error::Cancelled`] once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Check that threshold and padding are in range
    pub fn validate(&self) -> Result<()> {
        if !SIMILARITY_THRESHOLD_RANGE.contains(&self.similarity_threshold) {
            return Err(Error::InvalidConfig(format!(
                "similarity threshold must be within 0..=100 (got {})",
                self.similarity_threshold
            )));
        }
        if !BBOX_PADDING_RANGE.contains(&self.bbox_padding) {
            return Err(Error::InvalidConfig(format!(
                "bounding box padding must be within 0..=10 mm (got {})",
                self.bbox_padding
            )));
        }
        Ok(())
    }

    fn checkpoint(&self) -> Result<()> {
        let cancelled = self.cancel.as_ref().is_some_and(CancelToken::is_cancelled);
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        if cancelled || expired {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One object ready for the rendering side
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ColoredObject {
    /// Archive entry the object was read from
    pub entry: String,
    /// Object `id` attribute
    pub id: Option<usize>,
    /// Object `name` attribute
    pub name: Option<String>,
    /// Vertex positions
    pub vertices: Vec<Vertex3>,
    /// Triangle vertex indices
    pub triangles: Vec<[usize; 3]>,
    /// Resolved colors
    pub colors: ColorAssignment,
    /// Bounds of the vertices touched by painted triangles, unpadded
    pub bounding_box: Option<BoundingBox>,
    /// Number of painted triangles
    pub painted_faces: usize,
}

impl ColoredObject {
    /// Color of each face through the palette (material mode)
    ///
    /// `None` in vertex mode, or when a face index lies outside the palette.
    pub fn face_colors(&self) -> Option<Vec<Rgb>> {
        match &self.colors {
            ColorAssignment::Palette {
                palette,
                face_indices,
            } => face_indices.iter().map(|&i| palette.get(i).copied()).collect(),
            ColorAssignment::PerVertex { .. } => None,
        }
    }

    /// Vertex colors as renderer RGBA in `[0, 1]` (vertex mode)
    pub fn vertex_colors_normalized(&self) -> Option<Vec<[f32; 4]>> {
        match &self.colors {
            ColorAssignment::PerVertex { colors } => {
                Some(colors.iter().map(Rgb::to_normalized).collect())
            }
            ColorAssignment::Palette { .. } => None,
        }
    }

    /// Cutting boxes for the colored/uncolored split, if anything is painted
    pub fn region_split(&self, padding: f64) -> Option<RegionSplit> {
        self.bounding_box.map(|bbox| RegionSplit::new(bbox, padding))
    }
}

/// Receives objects as they are resolved
pub trait ObjectSink {
    /// Take ownership of one finished object
    fn emit_object(&mut self, object: ColoredObject) -> Result<()>;
}

impl ObjectSink for Vec<ColoredObject> {
    fn emit_object(&mut self, object: ColoredObject) -> Result<()> {
        self.push(object);
        Ok(())
    }
}

/// Package-level facts gathered during an import
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PackageInfo {
    /// Detected layout
    pub layout: PackageLayout,
    /// Filament colors from the slicing metadata (empty for legacy packages)
    pub filament_colors: FilamentColors,
    /// Model entries processed, in archive order
    pub entries: Vec<String>,
}

/// Everything an import produced
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ImportResult {
    /// Package-level facts
    pub package: PackageInfo,
    /// Objects in entry order, then document order
    pub objects: Vec<ColoredObject>,
    /// Threshold the palettes were built with
    pub similarity_threshold: f64,
    /// Padding the consumer should apply to the uncolored region cut
    pub bbox_padding: f64,
}

/// Import a package from a reader
pub fn import<R: Read + Seek>(reader: R, config: &ImportConfig) -> Result<ImportResult> {
    let mut objects: Vec<ColoredObject> = Vec::new();
    let package = import_into(reader, config, &mut objects)?;
    Ok(ImportResult {
        package,
        objects,
        similarity_threshold: config.similarity_threshold,
        bbox_padding: config.bbox_padding,
    })
}

/// Import a package from a file on disk
pub fn import_path(path: impl AsRef<Path>, config: &ImportConfig) -> Result<ImportResult> {
    let path = path.as_ref();
    info!(path = %path.display(), "importing 3MF package");
    let file = std::fs::File::open(path)?;
    import(std::io::BufReader::new(file), config)
}

/// Import a package, streaming each object into `sink`
pub fn import_into<R: Read + Seek, S: ObjectSink + ?Sized>(
    reader: R,
    config: &ImportConfig,
    sink: &mut S,
) -> Result<PackageInfo> {
    config.validate()?;

    // The archive is only needed until every entry is in memory
    let (info, models) = {
        let mut package = Package::open(reader)?;
        let layout = package.detect_layout()?;
        let filament_colors = match layout {
            PackageLayout::FilamentPaint => load_filament_colors(&mut package, config)?,
            PackageLayout::Legacy => FilamentColors::new(),
        };
        let entries = package.model_entries(layout)?;
        let models = entries
            .iter()
            .map(|name| package.read_entry(name))
            .collect::<Result<Vec<_>>>()?;
        let info = PackageInfo {
            layout,
            filament_colors,
            entries,
        };
        (info, models)
    };

    info!(
        layout = ?info.layout,
        entries = info.entries.len(),
        filaments = info.filament_colors.len(),
        mode = ?config.mode,
        "resolving package colors"
    );

    let jobs: Vec<(&String, &Vec<u8>)> = info.entries.iter().zip(&models).collect();

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        let resolved = jobs
            .par_iter()
            .map(|(entry, xml)| process_entry(entry, xml, &info, config))
            .collect::<Result<Vec<_>>>()?;
        for object in resolved.into_iter().flatten() {
            sink.emit_object(object)?;
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        for (entry, xml) in jobs {
            for object in process_entry(entry, xml, &info, config)? {
                sink.emit_object(object)?;
            }
        }
    }

    Ok(info)
}

/// Read the filament colors, treating an absent metadata entry as empty
fn load_filament_colors<R: Read + Seek>(
    package: &mut Package<R>,
    config: &ImportConfig,
) -> Result<FilamentColors> {
    let Some(bytes) = package.read_optional_entry(SLICE_INFO_PATH)? else {
        info!("no {} in package, painted faces resolve to the sentinel", SLICE_INFO_PATH);
        return Ok(FilamentColors::new());
    };

    match parse_slice_info(&bytes) {
        Ok(colors) => Ok(colors),
        Err(e @ Error::MalformedMetadata(_)) if config.metadata_policy == MetadataPolicy::Lenient => {
            warn!(error = %e, "ignoring malformed slicing metadata");
            Ok(FilamentColors::new())
        }
        Err(e) => Err(e),
    }
}

/// Parse one model entry and resolve all of its objects
fn process_entry(
    entry: &str,
    xml: &[u8],
    info: &PackageInfo,
    config: &ImportConfig,
) -> Result<Vec<ColoredObject>> {
    config.checkpoint()?;

    let model = parse_model(xml).map_err(|e| match e {
        Error::MalformedModel(msg) => Error::MalformedModel(format!("{}: {}", entry, msg)),
        other => other,
    })?;

    let source = source_for(info, &model);
    let resolver = ColorResolver::new(source).with_threshold(config.similarity_threshold);

    let mut objects = Vec::with_capacity(model.objects.len());
    for object in &model.objects {
        config.checkpoint()?;

        let coloring = resolver.resolve(object, config.mode);
        debug!(
            entry,
            id = ?object.id,
            vertices = object.mesh.vertices.len(),
            triangles = object.mesh.triangles.len(),
            painted = coloring.painted_faces,
            "resolved object colors"
        );

        objects.push(ColoredObject {
            entry: entry.to_string(),
            id: object.id,
            name: object.name.clone(),
            vertices: object.mesh.vertices.clone(),
            triangles: object.mesh.triangles.iter().map(|t| t.indices()).collect(),
            colors: coloring.assignment,
            bounding_box: coloring.bounding_box,
            painted_faces: coloring.painted_faces,
        });
    }

    Ok(objects)
}

fn source_for<'a>(info: &'a PackageInfo, model: &'a ParsedModel) -> ColorSource<'a> {
    match info.layout {
        PackageLayout::FilamentPaint => ColorSource::Filament(&info.filament_colors),
        PackageLayout::Legacy => ColorSource::ColorGroups(model),
    }
}
