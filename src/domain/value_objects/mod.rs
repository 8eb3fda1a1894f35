mod channel_name;
mod data_unit_id;
mod stream_role;
mod stream_state;

pub use channel_name::ChannelName;
pub use data_unit_id::DataUnitId;
pub use stream_role::StreamRole;
pub use stream_state::StreamState;
