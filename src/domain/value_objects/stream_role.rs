use serde::{Deserialize, Serialize};

/// Which physical file of a channel a byte stream refers to.
///
/// Every channel owns four files: its primary data, the part boundary
/// index over that data, the concatenated per-part segment indexes, and
/// the boundary index that delimits those segment indexes per part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamRole {
    Data,
    BoundaryIndex,
    SegmentIndex,
    SegmentBoundaryIndex,
}

impl StreamRole {
    pub fn all() -> &'static [StreamRole] {
        &[
            StreamRole::Data,
            StreamRole::BoundaryIndex,
            StreamRole::SegmentIndex,
            StreamRole::SegmentBoundaryIndex,
        ]
    }

    /// Suffix appended after the channel extension.
    pub fn suffix(&self) -> &'static str {
        match self {
            StreamRole::Data => "",
            StreamRole::BoundaryIndex => ".bdy",
            StreamRole::SegmentIndex => ".seg",
            StreamRole::SegmentBoundaryIndex => ".seg.bdy",
        }
    }

    /// Only channel data is eligible for compression; index files stay
    /// fixed-width so they can be addressed directly.
    pub fn is_index(&self) -> bool {
        !matches!(self, StreamRole::Data)
    }
}

impl std::fmt::Display for StreamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamRole::Data => write!(f, "data"),
            StreamRole::BoundaryIndex => write!(f, "boundary_index"),
            StreamRole::SegmentIndex => write!(f, "segment_index"),
            StreamRole::SegmentBoundaryIndex => write!(f, "segment_boundary_index"),
        }
    }
}
