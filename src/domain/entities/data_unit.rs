use serde::{Deserialize, Serialize};

use crate::domain::value_objects::DataUnitId;

/// The logical record a reader or writer session is bound to.
///
/// Its lifecycle (locking, status, retention) belongs to the catalog
/// service; the codec only needs the id and type for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataUnit {
    id: DataUnitId,
    type_name: String,
}

impl DataUnit {
    pub fn new(id: impl Into<DataUnitId>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
        }
    }

    pub fn id(&self) -> DataUnitId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl std::fmt::Display for DataUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.type_name)
    }
}
