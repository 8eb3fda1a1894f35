pub mod builder;
pub mod data_store;
pub mod dto;
pub mod errors;
pub mod ports;
pub mod use_cases;
