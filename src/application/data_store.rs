use std::rc::Rc;
use tracing::info;

use crate::application::ports::ByteStreamFactory;
use crate::codec::{ReadMultiplexer, WriteMultiplexer};
use crate::domain::entities::DataUnit;

/// Entry point for opening sessions on data units.
///
/// Sessions are not synchronised: at most one session per data unit may be
/// open at a time.
#[derive(Clone)]
pub struct DataStore {
    factory: Rc<dyn ByteStreamFactory>,
    buffer_capacity: usize,
}

impl DataStore {
    pub fn new(factory: Rc<dyn ByteStreamFactory>, buffer_capacity: usize) -> Self {
        Self {
            factory,
            buffer_capacity,
        }
    }

    /// Start writing a data unit. The caller must `close` (or `abort`) the
    /// returned session.
    pub fn open_writer_session(&self, unit: &DataUnit) -> WriteMultiplexer {
        info!(unit = %unit.id(), type_name = unit.type_name(), "Opening writer session");
        WriteMultiplexer::with_capacity(self.factory.clone(), unit.clone(), self.buffer_capacity)
    }

    pub fn open_reader_session(&self, unit: &DataUnit) -> ReadMultiplexer {
        info!(unit = %unit.id(), type_name = unit.type_name(), "Opening reader session");
        ReadMultiplexer::new(self.factory.clone(), unit.clone())
    }

    pub fn factory(&self) -> &Rc<dyn ByteStreamFactory> {
        &self.factory
    }
}
