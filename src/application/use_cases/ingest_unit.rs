use std::io::Write;
use tracing::{info, warn};

use crate::application::data_store::DataStore;
use crate::application::dto::{IngestRequest, IngestSummary};
use crate::application::errors::UseCaseError;
use crate::codec::{ChannelSink, WriteMultiplexer};
use crate::domain::errors::CodecResult;
use crate::domain::value_objects::ChannelName;

/// Use case: write a data unit from in-memory payloads
pub struct IngestUnitUseCase {
    store: DataStore,
}

impl IngestUnitUseCase {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    /// Write every part, then close the session. On failure the partially
    /// written unit is removed.
    pub fn execute(&self, request: IngestRequest) -> Result<IngestSummary, UseCaseError> {
        let part_count = request.parts.len() as u64;
        if let Some(index) = request.context.keys().find(|index| **index >= part_count) {
            return Err(UseCaseError::InvalidRequest(format!(
                "context for part {} but only {} parts given",
                index, part_count
            )));
        }

        let mut session = self.store.open_writer_session(&request.unit);
        for (key, value) in request.attributes.iter() {
            session.attributes_mut().insert(key, value);
        }

        match write_parts(&mut session, &request) {
            Ok(summary) => {
                session.close()?;
                info!(
                    unit = summary.unit,
                    parts = summary.parts,
                    segments = summary.segments,
                    bytes = summary.bytes,
                    "Ingested data unit"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(unit = %request.unit.id(), error = %e, "Ingest failed, removing partial unit");
                if let Err(abort_error) = session.abort() {
                    warn!(error = %abort_error, "Failed to remove partial unit");
                }
                Err(e)
            }
        }
    }
}

fn write_parts(
    session: &mut WriteMultiplexer,
    request: &IngestRequest,
) -> Result<IngestSummary, UseCaseError> {
    let mut summary = IngestSummary {
        unit: request.unit.id().as_u64(),
        parts: 0,
        segments: 0,
        bytes: 0,
    };

    for (index, payload) in request.parts.iter().enumerate() {
        let index = index as u64;
        let mut part = session.part(index)?;

        let mut data = part.get()?;
        summary.segments += write_segmented(&mut data, payload, request.segment_delimiter)?;
        data.close()?;

        if let Some(context) = request.context.get(&index) {
            let mut sink = part.channel(&ChannelName::context())?;
            sink.write_all(context)?;
            sink.close()?;
        }

        summary.parts += 1;
        summary.bytes += payload.len() as u64;
    }
    Ok(summary)
}

/// Write `payload`, ending a segment after each delimiter. Bytes after the
/// last delimiter become the final segment when the part closes.
fn write_segmented(
    sink: &mut ChannelSink<'_>,
    payload: &[u8],
    delimiter: Option<u8>,
) -> CodecResult<u64> {
    let Some(delimiter) = delimiter else {
        sink.write_all(payload)?;
        return Ok(u64::from(!payload.is_empty()));
    };

    let mut segments = 0;
    for chunk in payload.split_inclusive(|byte| *byte == delimiter) {
        sink.write_all(chunk)?;
        if chunk.last() == Some(&delimiter) {
            sink.add_segment()?;
        }
        segments += 1;
    }
    Ok(segments)
}
