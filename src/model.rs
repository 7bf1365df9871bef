//! Geometry parsed from 3MF model entries

use crate::color::Rgb;

/// Which of the two supported package layouts a 3MF file uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PackageLayout {
    /// One or more `3D/Objects/*.model` entries with per-triangle paint codes,
    /// colored through `Metadata/slice_info.config`
    FilamentPaint,
    /// A single `3D/3dmodel.model` entry colored through `colorgroup` resources
    Legacy,
}

/// A vertex position in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vertex3 {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex3 {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A triangle defined by three vertex indices
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Triangle {
    /// Index of first vertex
    pub v1: usize,
    /// Index of second vertex
    pub v2: usize,
    /// Index of third vertex
    pub v3: usize,
    /// Filament paint code (`paint_color` attribute)
    pub paint_color: Option<String>,
    /// Legacy property group reference
    pub pid: Option<usize>,
    /// Legacy property index for the first vertex, used as the whole-face color
    pub p1: Option<usize>,
}

impl Triangle {
    /// Create a new unpainted triangle
    pub fn new(v1: usize, v2: usize, v3: usize) -> Self {
        Self {
            v1,
            v2,
            v3,
            ..Default::default()
        }
    }

    /// Create a new triangle carrying a paint code
    pub fn with_paint(v1: usize, v2: usize, v3: usize, paint_color: impl Into<String>) -> Self {
        Self {
            paint_color: Some(paint_color.into()),
            ..Self::new(v1, v2, v3)
        }
    }

    /// The three vertex indices in winding order
    pub fn indices(&self) -> [usize; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// The paint code, if present and non-empty
    pub fn paint_code(&self) -> Option<&str> {
        self.paint_color.as_deref().filter(|code| !code.is_empty())
    }
}

/// A triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// List of vertices
    pub vertices: Vec<Vertex3>,
    /// List of triangles
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that every triangle references an existing vertex
    pub fn out_of_range_index(&self) -> Option<(usize, usize)> {
        let count = self.vertices.len();
        self.triangles.iter().enumerate().find_map(|(i, t)| {
            t.indices()
                .into_iter()
                .find(|&v| v >= count)
                .map(|v| (i, v))
        })
    }
}

/// One `<object>` with a mesh, as read from a model entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedObject {
    /// Object `id` attribute
    pub id: Option<usize>,
    /// Object `name` attribute
    pub name: Option<String>,
    /// Object-level default property group
    pub pid: Option<usize>,
    /// Object-level default property index
    pub pindex: Option<usize>,
    /// Geometry
    pub mesh: Mesh,
}

/// Legacy `colorgroup` resource
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGroup {
    /// Resource ID referenced by `pid`
    pub id: usize,
    /// Colors in document order, indexed by `p1`/`pindex`
    pub colors: Vec<Rgb>,
}

impl ColorGroup {
    /// Create an empty color group
    pub fn new(id: usize) -> Self {
        Self {
            id,
            colors: Vec::new(),
        }
    }
}

/// Everything a single model entry contributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedModel {
    /// Mesh objects in document order
    pub objects: Vec<ParsedObject>,
    /// Legacy color groups in document order
    pub color_groups: Vec<ColorGroup>,
}

impl ParsedModel {
    /// Look up a color group by resource ID
    pub fn color_group(&self, id: usize) -> Option<&ColorGroup> {
        self.color_groups.iter().find(|g| g.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_code_filters_empty() {
        assert_eq!(Triangle::new(0, 1, 2).paint_code(), None);
        assert_eq!(Triangle::with_paint(0, 1, 2, "").paint_code(), None);
        assert_eq!(Triangle::with_paint(0, 1, 2, "1C").paint_code(), Some("1C"));
    }

    #[test]
    fn test_out_of_range_index() {
        let mut mesh = Mesh::new();
        mesh.vertices = vec![Vertex3::new(0.0, 0.0, 0.0); 3];
        mesh.triangles = vec![Triangle::new(0, 1, 2)];
        assert_eq!(mesh.out_of_range_index(), None);

        mesh.triangles.push(Triangle::new(0, 3, 1));
        assert_eq!(mesh.out_of_range_index(), Some((1, 3)));
    }
}
