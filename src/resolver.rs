//! Per-triangle color resolution
//!
//! A triangle is either *painted* (it carries a paint code, or in legacy
//! packages a resolvable color group reference) or not. Painted triangles get
//! the blend of their filament colors; the vertices they touch are recorded
//! and bound the colored region of the object.
//!
//! Two output modes exist:
//!
//! - [`ColorMode::Material`]: every face gets a color (unpainted faces get
//!   the sentinel), and faces are grouped into a palette with a greedy,
//!   order-dependent, first-match similarity merge.
//! - [`ColorMode::Vertex`]: every vertex gets the mean of the blends of the
//!   painted triangles touching it, or the sentinel when none do.

use crate::color::{FilamentColors, Rgb, blend, decode_paint_code};
use crate::mesh_ops::BoundingBox;
use crate::model::{ParsedModel, ParsedObject, Triangle};

/// Default Euclidean RGB distance under which colors share a palette entry
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 10.0;

/// How resolved colors are handed to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ColorMode {
    /// Palette of materials plus a palette index per face
    #[default]
    Material,
    /// One blended color per vertex
    Vertex,
}

/// Blend the filament colors named by a paint code
///
/// Filament indices missing from `colors` contribute the sentinel to the
/// blend. A code with no recognised segment resolves to the sentinel.
pub fn resolve_paint_code(code: &str, colors: &FilamentColors) -> Rgb {
    let rgbs: Vec<Rgb> = decode_paint_code(code)
        .into_iter()
        .map(|index| colors.color_for(index))
        .collect();
    blend(&rgbs).unwrap_or(Rgb::SENTINEL)
}

/// Where triangle colors come from
#[derive(Debug, Clone, Copy)]
pub enum ColorSource<'a> {
    /// Paint codes resolved through the slicing metadata's filament colors
    Filament(&'a FilamentColors),
    /// Legacy `colorgroup` resources of the model the object came from
    ColorGroups(&'a ParsedModel),
}

impl ColorSource<'_> {
    /// Color of a painted triangle, or `None` if the triangle is unpainted
    pub fn triangle_color(&self, object: &ParsedObject, triangle: &Triangle) -> Option<Rgb> {
        match self {
            ColorSource::Filament(colors) => triangle
                .paint_code()
                .map(|code| resolve_paint_code(code, colors)),
            ColorSource::ColorGroups(model) => {
                let pid = triangle.pid.or(object.pid)?;
                let index = triangle.p1.or(object.pindex)?;
                model.color_group(pid)?.colors.get(index).copied()
            }
        }
    }
}

/// Ordered palette with first-match similarity merging
///
/// A new color joins the first existing entry, in insertion order, within
/// `threshold` of it; the nearest entry is not searched for. Otherwise it is
/// appended. Palette contents therefore depend on insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Rgb>,
    threshold: f64,
}

impl Palette {
    /// Create an empty palette
    pub fn new(threshold: f64) -> Self {
        Self {
            colors: Vec::new(),
            threshold,
        }
    }

    /// Index of the first entry within the threshold of `color`
    pub fn find_similar(&self, color: &Rgb) -> Option<usize> {
        self.colors
            .iter()
            .position(|existing| existing.distance(color) <= self.threshold)
    }

    /// Palette index for `color`, appending it if no entry is similar
    pub fn assign(&mut self, color: Rgb) -> usize {
        self.find_similar(&color).unwrap_or_else(|| {
            self.colors.push(color);
            self.colors.len() - 1
        })
    }

    /// Entries in insertion order
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Check if the palette is empty
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Take the entries
    pub fn into_colors(self) -> Vec<Rgb> {
        self.colors
    }
}

/// Running mean of the colors contributed to one vertex
#[derive(Debug, Clone, Copy, PartialEq)]
struct Accumulator {
    sum: Rgb,
    count: usize,
}

impl Accumulator {
    fn add(slot: &mut Option<Accumulator>, color: Rgb) {
        match slot {
            Some(acc) => {
                acc.sum = Rgb::new(acc.sum.r + color.r, acc.sum.g + color.g, acc.sum.b + color.b);
                acc.count += 1;
            }
            None => {
                *slot = Some(Accumulator {
                    sum: color,
                    count: 1,
                })
            }
        }
    }

    fn mean(&self) -> Rgb {
        let n = self.count as f64;
        Rgb::new(self.sum.r / n, self.sum.g / n, self.sum.b / n)
    }
}

/// Colors contributed by painted triangles, per vertex
///
/// A vertex is *touched* once any painted triangle references it.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexContributions {
    slots: Vec<Option<Accumulator>>,
}

impl VertexContributions {
    /// No contributions for `vertex_count` vertices
    pub fn new(vertex_count: usize) -> Self {
        Self {
            slots: vec![None; vertex_count],
        }
    }

    /// Record a painted triangle's color on each of its vertices
    pub fn add_triangle(&mut self, triangle: &Triangle, color: Rgb) {
        for v in triangle.indices() {
            if let Some(slot) = self.slots.get_mut(v) {
                Accumulator::add(slot, color);
            }
        }
    }

    /// Indices of touched vertices in ascending order
    pub fn touched(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|_| i))
    }

    /// Check if no vertex was touched
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Mean contribution of a vertex, if touched
    pub fn mean(&self, vertex: usize) -> Option<Rgb> {
        self.slots.get(vertex).copied().flatten().map(|acc| acc.mean())
    }
}

/// Resolved colors of one object
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ColorAssignment {
    /// Material mode output
    Palette {
        /// Palette entries in insertion order
        palette: Vec<Rgb>,
        /// Palette index of each face, parallel to the triangle list
        face_indices: Vec<usize>,
    },
    /// Vertex mode output, parallel to the vertex list, in the 0-255 domain
    PerVertex {
        /// Blended vertex colors
        colors: Vec<Rgb>,
    },
}

/// Color assignment plus the painted-region bounds of one object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectColoring {
    /// Colors in the requested mode
    pub assignment: ColorAssignment,
    /// Bounds of the touched vertices; `None` when nothing is painted
    pub bounding_box: Option<BoundingBox>,
    /// Number of painted triangles
    pub painted_faces: usize,
}

/// Resolves the colors of parsed objects
#[derive(Debug, Clone, Copy)]
pub struct ColorResolver<'a> {
    source: ColorSource<'a>,
    threshold: f64,
}

impl<'a> ColorResolver<'a> {
    /// Create a resolver with the default similarity threshold
    pub fn new(source: ColorSource<'a>) -> Self {
        Self {
            source,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    /// Set the palette similarity threshold (material mode only)
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Resolve an object in the given mode
    pub fn resolve(&self, object: &ParsedObject, mode: ColorMode) -> ObjectColoring {
        match mode {
            ColorMode::Material => self.resolve_material(object),
            ColorMode::Vertex => self.resolve_vertex(object),
        }
    }

    /// Palette plus per-face palette index
    pub fn resolve_material(&self, object: &ParsedObject) -> ObjectColoring {
        let mesh = &object.mesh;
        let mut contributions = VertexContributions::new(mesh.vertices.len());
        let mut palette = Palette::new(self.threshold);
        let mut face_indices = Vec::with_capacity(mesh.triangles.len());
        let mut painted_faces = 0;

        // Triangle order matters: palette growth is order-dependent
        for triangle in &mesh.triangles {
            let color = match self.source.triangle_color(object, triangle) {
                Some(color) => {
                    painted_faces += 1;
                    contributions.add_triangle(triangle, color);
                    color
                }
                None => Rgb::SENTINEL,
            };
            face_indices.push(palette.assign(color));
        }

        ObjectColoring {
            assignment: ColorAssignment::Palette {
                palette: palette.into_colors(),
                face_indices,
            },
            bounding_box: BoundingBox::from_indices(&mesh.vertices, contributions.touched()),
            painted_faces,
        }
    }

    /// Per-vertex mean of the painted triangle colors
    pub fn resolve_vertex(&self, object: &ParsedObject) -> ObjectColoring {
        let mesh = &object.mesh;
        let mut contributions = VertexContributions::new(mesh.vertices.len());
        let mut painted_faces = 0;

        for triangle in &mesh.triangles {
            if let Some(color) = self.source.triangle_color(object, triangle) {
                painted_faces += 1;
                contributions.add_triangle(triangle, color);
            }
        }

        let colors = (0..mesh.vertices.len())
            .map(|v| contributions.mean(v).unwrap_or(Rgb::SENTINEL))
            .collect();

        ObjectColoring {
            assignment: ColorAssignment::PerVertex { colors },
            bounding_box: BoundingBox::from_indices(&mesh.vertices, contributions.touched()),
            painted_faces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColorGroup, Mesh, Vertex3};

    fn filaments() -> FilamentColors {
        [
            ("4", Rgb::from_u8(255, 0, 0)),
            ("5", Rgb::from_u8(0, 255, 0)),
        ]
        .into_iter()
        .collect()
    }

    /// Two triangles sharing the edge 1-2 over four vertices
    fn quad(paint: [Option<&str>; 2]) -> ParsedObject {
        let mut mesh = Mesh::new();
        mesh.vertices = vec![
            Vertex3::new(0.0, 0.0, 0.0),
            Vertex3::new(1.0, 0.0, 0.0),
            Vertex3::new(0.0, 1.0, 0.0),
            Vertex3::new(1.0, 1.0, 5.0),
        ];
        let tri = |v: [usize; 3], p: Option<&str>| Triangle {
            paint_color: p.map(str::to_string),
            ..Triangle::new(v[0], v[1], v[2])
        };
        mesh.triangles = vec![tri([0, 1, 2], paint[0]), tri([1, 3, 2], paint[1])];
        ParsedObject {
            id: Some(1),
            mesh,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_paint_code_blend() {
        let colors = filaments();
        assert_eq!(
            resolve_paint_code("1C2C", &colors),
            Rgb::new(127.5, 127.5, 0.0)
        );
        assert_eq!(resolve_paint_code("1C", &colors), Rgb::from_u8(255, 0, 0));
    }

    #[test]
    fn test_resolve_paint_code_unresolved_filament_blends_sentinel() {
        // "3C" is filament 6, which has no metadata color
        let colors = filaments();
        assert_eq!(
            resolve_paint_code("1C3C", &colors),
            Rgb::new(255.0, 0.0, 127.5)
        );
    }

    #[test]
    fn test_resolve_paint_code_only_unknown_segments() {
        assert_eq!(resolve_paint_code("ZZ", &filaments()), Rgb::SENTINEL);
        assert_eq!(resolve_paint_code("ZZ1C", &filaments()), Rgb::from_u8(255, 0, 0));
    }

    #[test]
    fn test_resolve_paint_code_is_deterministic() {
        let colors = filaments();
        let a = resolve_paint_code("1C2C3C", &colors);
        let b = resolve_paint_code("1C2C3C", &colors);
        assert_eq!(a.r.to_bits(), b.r.to_bits());
        assert_eq!(a.g.to_bits(), b.g.to_bits());
        assert_eq!(a.b.to_bits(), b.b.to_bits());
    }

    #[test]
    fn test_palette_first_match_not_nearest() {
        let mut palette = Palette::new(10.0);
        let c1 = Rgb::new(100.0, 100.0, 100.0);
        let c2 = Rgb::new(112.0, 100.0, 100.0);
        assert_eq!(palette.assign(c1), 0);
        // 12 away from c1: new entry
        assert_eq!(palette.assign(c2), 1);
        // 8 from c1, 4 from c2: joins c1 because it comes first
        assert_eq!(palette.assign(Rgb::new(108.0, 100.0, 100.0)), 0);
        assert_eq!(palette.colors(), &[c1, c2]);
    }

    #[test]
    fn test_palette_threshold_zero() {
        let mut palette = Palette::new(0.0);
        palette.assign(Rgb::from_u8(10, 10, 10));
        palette.assign(Rgb::from_u8(10, 10, 11));
        palette.assign(Rgb::from_u8(10, 10, 10));
        assert_eq!(palette.len(), 2);
    }

    #[test]
    fn test_palette_threshold_max_merges_close_colors() {
        let mut palette = Palette::new(100.0);
        palette.assign(Rgb::from_u8(10, 10, 10));
        palette.assign(Rgb::from_u8(60, 60, 60));
        palette.assign(Rgb::from_u8(255, 255, 255));
        assert_eq!(palette.len(), 2);
    }

    #[test]
    fn test_material_mode_unpainted_faces_use_sentinel() {
        let colors = filaments();
        let resolver = ColorResolver::new(ColorSource::Filament(&colors));
        let coloring = resolver.resolve_material(&quad([Some("1C"), None]));

        let ColorAssignment::Palette {
            palette,
            face_indices,
        } = coloring.assignment
        else {
            panic!("expected palette assignment");
        };
        assert_eq!(palette, vec![Rgb::from_u8(255, 0, 0), Rgb::SENTINEL]);
        assert_eq!(face_indices, vec![0, 1]);
        assert_eq!(coloring.painted_faces, 1);

        // Only vertices 0, 1, 2 are touched; vertex 3 (z=5) is not
        let bbox = coloring.bounding_box.unwrap();
        assert_eq!(bbox.min, Vertex3::new(0.0, 0.0, 0.0));
        assert_eq!(bbox.max, Vertex3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_no_paint_no_bounding_box() {
        let colors = filaments();
        let resolver = ColorResolver::new(ColorSource::Filament(&colors));
        let object = quad([None, Some("")]);
        assert!(resolver.resolve_material(&object).bounding_box.is_none());
        assert!(resolver.resolve_vertex(&object).bounding_box.is_none());
    }

    #[test]
    fn test_unknown_only_paint_still_touches_vertices() {
        let colors = filaments();
        let resolver = ColorResolver::new(ColorSource::Filament(&colors));
        let coloring = resolver.resolve_material(&quad([Some("ZZ"), None]));
        assert!(coloring.bounding_box.is_some());
        let ColorAssignment::Palette { palette, .. } = coloring.assignment else {
            panic!("expected palette assignment");
        };
        assert_eq!(palette, vec![Rgb::SENTINEL]);
    }

    #[test]
    fn test_vertex_mode_means() {
        let colors = filaments();
        let resolver = ColorResolver::new(ColorSource::Filament(&colors));
        let coloring = resolver.resolve_vertex(&quad([Some("1C"), Some("2C")]));

        let ColorAssignment::PerVertex { colors } = coloring.assignment else {
            panic!("expected per-vertex assignment");
        };
        assert_eq!(colors[0], Rgb::from_u8(255, 0, 0));
        assert_eq!(colors[1], Rgb::new(127.5, 127.5, 0.0));
        assert_eq!(colors[2], Rgb::new(127.5, 127.5, 0.0));
        assert_eq!(colors[3], Rgb::from_u8(0, 255, 0));
        assert_eq!(coloring.painted_faces, 2);
    }

    #[test]
    fn test_vertex_mode_untouched_vertex_sentinel() {
        let colors = filaments();
        let resolver = ColorResolver::new(ColorSource::Filament(&colors));
        let coloring = resolver.resolve(&quad([Some("1C"), None]), ColorMode::Vertex);
        let ColorAssignment::PerVertex { colors } = coloring.assignment else {
            panic!("expected per-vertex assignment");
        };
        assert_eq!(colors[3], Rgb::SENTINEL);
    }

    #[test]
    fn test_color_groups_source() {
        let mut group = ColorGroup::new(9);
        group.colors = vec![Rgb::from_u8(1, 2, 3), Rgb::from_u8(4, 5, 6)];
        let model = ParsedModel {
            objects: Vec::new(),
            color_groups: vec![group],
        };
        let source = ColorSource::ColorGroups(&model);

        let mut object = quad([None, None]);
        object.mesh.triangles[0].pid = Some(9);
        object.mesh.triangles[0].p1 = Some(1);
        assert_eq!(
            source.triangle_color(&object, &object.mesh.triangles[0]),
            Some(Rgb::from_u8(4, 5, 6))
        );
        assert_eq!(source.triangle_color(&object, &object.mesh.triangles[1]), None);

        // Object-level defaults apply to triangles without their own reference
        object.pid = Some(9);
        object.pindex = Some(0);
        assert_eq!(
            source.triangle_color(&object, &object.mesh.triangles[1]),
            Some(Rgb::from_u8(1, 2, 3))
        );

        // Out-of-range index or unknown group: unpainted
        object.pindex = Some(7);
        assert_eq!(source.triangle_color(&object, &object.mesh.triangles[1]), None);
    }

    #[test]
    fn test_legacy_source_ignores_paint_codes() {
        let model = ParsedModel::default();
        let source = ColorSource::ColorGroups(&model);
        let object = quad([Some("1C"), None]);
        assert_eq!(source.triangle_color(&object, &object.mesh.triangles[0]), None);
    }
}
