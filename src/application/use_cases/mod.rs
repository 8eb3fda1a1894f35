mod describe_unit;
mod ingest_unit;
mod read_part;
mod step_record;

pub use describe_unit::DescribeUnitUseCase;
pub use ingest_unit::IngestUnitUseCase;
pub use read_part::ReadPartUseCase;
pub use step_record::StepRecordUseCase;
