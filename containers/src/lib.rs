pub mod block_info;
pub mod types;

pub use block_info::BlockInfo;
pub use types::{BlockNumber, Bytes32};
