use std::path::{Path, PathBuf};

use crate::domain::value_objects::{ChannelName, DataUnitId, StreamRole};

/// Utility for generating storage paths
pub struct PathBuilder {
    root: PathBuf,
}

impl PathBuilder {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a unit's streams: /root/store/{bucket}
    pub fn bucket_dir(&self, unit: DataUnitId) -> PathBuf {
        self.root.join("store").join(unit.bucket())
    }

    /// Stream path: /root/store/{bucket}/{id}.{ext}{suffix}
    pub fn stream_path(&self, unit: DataUnitId, channel: &ChannelName, role: StreamRole) -> PathBuf {
        let file_name = format!(
            "{}.{}{}",
            unit.file_stem(),
            channel.extension(),
            role.suffix()
        );
        self.bucket_dir(unit).join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_paths() {
        let builder = PathBuilder::new(PathBuf::from("/var/segstore"));
        let unit = DataUnitId::new(1_234_567);

        assert_eq!(
            builder.stream_path(unit, &ChannelName::data(), StreamRole::Data),
            PathBuf::from("/var/segstore/store/000001234/000001234567.dat")
        );
        assert_eq!(
            builder.stream_path(unit, &ChannelName::context(), StreamRole::SegmentBoundaryIndex),
            PathBuf::from("/var/segstore/store/000001234/000001234567.ctx.seg.bdy")
        );

        let custom = ChannelName::new("page_layout").unwrap();
        assert_eq!(
            builder.stream_path(unit, &custom, StreamRole::BoundaryIndex),
            PathBuf::from("/var/segstore/store/000001234/000001234567.page_layout.bdy")
        );
    }

    #[test]
    fn test_distinct_channels_never_share_a_path() {
        let builder = PathBuilder::new(PathBuf::from("/var/segstore"));
        let unit = DataUnitId::new(5);
        let channels: Vec<ChannelName> = [
            ChannelName::DATA,
            ChannelName::CONTEXT,
            ChannelName::MANIFEST,
            ChannelName::SEGMENT_INDEX,
            ChannelName::BOUNDARY_INDEX,
            "context",
            "data",
            "manifest",
            "seg_index",
        ]
        .iter()
        .map(|name| ChannelName::new(*name).unwrap())
        .collect();

        let mut seen = std::collections::HashSet::new();
        for channel in &channels {
            for role in StreamRole::all() {
                let path = builder.stream_path(unit, channel, *role);
                assert!(seen.insert(path.clone()), "{:?} used twice", path);
            }
        }
    }
}
