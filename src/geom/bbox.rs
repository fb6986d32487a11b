use geo::Rect;
use rstar::{RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a feature by index.
#[derive(Debug, Clone)]
pub(crate) struct BoundingBox {
    idx: usize, // Index of the owning feature in the FeatureSet
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(crate) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Get the index of the owning feature.
    #[inline] pub(crate) fn idx(&self) -> usize { self.idx }

    /// Search envelope around this box, padded by `pad` on every side.
    pub(crate) fn padded(&self, pad: f64) -> AABB<[f64; 2]> {
        AABB::from_corners(
            [self.bbox.min().x - pad, self.bbox.min().y - pad],
            [self.bbox.max().x + pad, self.bbox.max().y + pad],
        )
    }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}
