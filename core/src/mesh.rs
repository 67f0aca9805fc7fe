//! Mesh primitive types.

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Every three vertices form a triangle (default).
    #[default]
    TriangleList,
    /// Each vertex after the second continues a triangle strip.
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Vertices consumed per primitive, used when generating a trivial
    /// sequential index run for unindexed geometry.
    pub fn vertices_per_primitive(&self) -> u32 {
        match self {
            Self::PointList => 1,
            Self::LineList => 2,
            Self::TriangleList | Self::TriangleStrip => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertices_per_primitive() {
        assert_eq!(PrimitiveTopology::PointList.vertices_per_primitive(), 1);
        assert_eq!(PrimitiveTopology::LineList.vertices_per_primitive(), 2);
        assert_eq!(PrimitiveTopology::TriangleList.vertices_per_primitive(), 3);
    }

    #[test]
    fn default_is_triangle_list() {
        assert_eq!(PrimitiveTopology::default(), PrimitiveTopology::TriangleList);
    }
}
