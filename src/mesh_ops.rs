//! Bounding regions over mesh vertices
//!
//! The bounding box of the painted part of an object drives the downstream
//! split into a colored and an uncolored region: the colored region is the
//! mesh intersected with the box, the uncolored region is the mesh minus the
//! box inflated by a small padding. The boolean geometry itself is left to
//! the consumer; this module only describes the two cutting boxes.

use crate::model::Vertex3;

/// An axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vertex3,
    /// Maximum corner
    pub max: Vertex3,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for no points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vertex3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(
            Self {
                min: first,
                max: first,
            },
            |bbox, p| Self {
                min: Vertex3::new(bbox.min.x.min(p.x), bbox.min.y.min(p.y), bbox.min.z.min(p.z)),
                max: Vertex3::new(bbox.max.x.max(p.x), bbox.max.y.max(p.y), bbox.max.z.max(p.z)),
            },
        ))
    }

    /// Box over the vertices at the given indices
    ///
    /// Indices outside `vertices` are ignored.
    pub fn from_indices(
        vertices: &[Vertex3],
        indices: impl IntoIterator<Item = usize>,
    ) -> Option<Self> {
        Self::from_points(indices.into_iter().filter_map(|i| vertices.get(i)))
    }

    /// Box grown by `margin` on every side
    pub fn padded(&self, margin: f64) -> Self {
        Self {
            min: Vertex3::new(self.min.x - margin, self.min.y - margin, self.min.z - margin),
            max: Vertex3::new(self.max.x + margin, self.max.y + margin, self.max.z + margin),
        }
    }

    /// Center point
    pub fn center(&self) -> Vertex3 {
        Vertex3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// Extent along each axis
    pub fn size(&self) -> Vertex3 {
        Vertex3::new(
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }

    /// Check if a point lies inside or on the box
    pub fn contains(&self, p: &Vertex3) -> bool {
        (self.min.x..=self.max.x).contains(&p.x)
            && (self.min.y..=self.max.y).contains(&p.y)
            && (self.min.z..=self.max.z).contains(&p.z)
    }
}

/// The two boxes a consumer cuts an object with
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RegionSplit {
    /// Intersect the mesh with this box to get the colored region
    pub colored: BoundingBox,
    /// Subtract this box from the mesh to get the uncolored region
    pub uncolored_cutter: BoundingBox,
}

impl RegionSplit {
    /// Split around a painted-region box with the given padding
    pub fn new(bbox: BoundingBox, padding: f64) -> Self {
        Self {
            colored: bbox,
            uncolored_cutter: bbox.padded(padding),
        }
    }
}
