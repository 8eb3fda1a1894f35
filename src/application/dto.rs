use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::entities::{AttributeMap, DataUnit};
use crate::domain::value_objects::ChannelName;

/// DTO for an ingest request: one payload per part
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub unit: DataUnit,
    pub parts: Vec<Vec<u8>>,
    /// Context payloads keyed by part index
    pub context: BTreeMap<u64, Vec<u8>>,
    pub attributes: AttributeMap,
    /// Byte ending a segment; `None` writes each part as one segment
    pub segment_delimiter: Option<u8>,
}

impl IngestRequest {
    pub fn new(unit: DataUnit) -> Self {
        Self {
            unit,
            parts: Vec::new(),
            context: BTreeMap::new(),
            attributes: AttributeMap::new(),
            segment_delimiter: Some(b'\n'),
        }
    }
}

/// DTO for ingest results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub unit: u64,
    pub parts: u64,
    pub segments: u64,
    pub bytes: u64,
}

/// DTO for reading one part or segment
#[derive(Debug, Clone)]
pub struct ReadPartRequest {
    pub unit: DataUnit,
    pub channel: ChannelName,
    pub part: u64,
    pub segment: Option<u64>,
}

/// Per-channel layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfoDto {
    pub name: String,
    pub parts: u64,
    /// Segment count of each part
    pub segments: Vec<u64>,
}

/// DTO for unit descriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfoDto {
    pub unit: u64,
    pub type_name: String,
    pub parts: u64,
    pub channels: Vec<ChannelInfoDto>,
    pub attributes: AttributeMap,
}

/// DTO for stepping to one record of a part
#[derive(Debug, Clone)]
pub struct ReadRecordRequest {
    pub unit: DataUnit,
    pub channel: ChannelName,
    pub part: u64,
    /// Zero-based record, clamped to the last record
    pub record: u64,
}

/// One record of a part, framed by the part's header and footer segments
/// when it has them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPage {
    pub record: u64,
    pub record_total: u64,
    pub bytes: Vec<u8>,
}
