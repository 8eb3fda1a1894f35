mod attribute_map;
mod data_unit;

pub use attribute_map::AttributeMap;
pub use data_unit::DataUnit;
