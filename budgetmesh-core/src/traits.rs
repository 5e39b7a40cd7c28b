//! Core traits for budgetmesh

use crate::{mesh::*, point::*};

/// Trait for geometry with a spatial extent
pub trait Bounded {
    /// Get the axis-aligned bounding box of the object
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        Point3f::new(
            (min.x + max.x) / 2.0,
            (min.y + max.y) / 2.0,
            (min.z + max.z) / 2.0,
        )
    }

    /// Length of the bounding box diagonal
    fn extent(&self) -> f32 {
        let (min, max) = self.bounding_box();
        (max - min).norm()
    }
}

/// Bounding box of a sequence of points, origin when the sequence is empty
pub fn bounding_box_of<'a, I>(points: I) -> (Point3f, Point3f)
where
    I: IntoIterator<Item = &'a Point3f>,
{
    let mut iter = points.into_iter();
    let Some(first) = iter.next() else {
        return (Point3f::origin(), Point3f::origin());
    };

    let mut min = *first;
    let mut max = *first;

    for p in iter {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        min.z = min.z.min(p.z);

        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
        max.z = max.z.max(p.z);
    }

    (min, max)
}

impl Bounded for TriangleMesh {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        bounding_box_of(&self.vertices)
    }
}
