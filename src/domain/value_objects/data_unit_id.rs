use serde::{Deserialize, Serialize};

/// Identifier of a data unit, assigned by the catalog service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataUnitId(u64);

impl DataUnitId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Directory bucket grouping ids by the thousand.
    pub fn bucket(&self) -> String {
        format!("{:09}", self.0 / 1000)
    }

    /// Zero-padded file stem.
    pub fn file_stem(&self) -> String {
        format!("{:012}", self.0)
    }
}

impl From<u64> for DataUnitId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DataUnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DataUnitId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_and_stem() {
        let id = DataUnitId::new(1_234_567);
        assert_eq!(id.bucket(), "000001234");
        assert_eq!(id.file_stem(), "000001234567");
    }

    #[test]
    fn test_from_str() {
        let id: DataUnitId = " 42 ".parse().unwrap();
        assert_eq!(id.as_u64(), 42);
        assert!("abc".parse::<DataUnitId>().is_err());
    }
}
