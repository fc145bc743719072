use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("index {index} out of range for status array of length {length}")]
    IndexOutOfRange { index: u64, length: u64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
