use std::fmt;

use crate::status::FastBlockStatus;

/// Which data a status list schedules.
///
/// Both pipelines share the scheduling algorithm and differ only in the
/// status triple they drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    Bodies,
    Receipts,
}

impl Pipeline {
    /// Status of a block that still has to be requested. New arrays are filled with it.
    pub const fn pending(self) -> FastBlockStatus {
        match self {
            Pipeline::Bodies => FastBlockStatus::Pending,
            Pipeline::Receipts => FastBlockStatus::Inserted,
        }
    }

    pub const fn sent(self) -> FastBlockStatus {
        match self {
            Pipeline::Bodies => FastBlockStatus::RequestSent,
            Pipeline::Receipts => FastBlockStatus::ReceiptRequestSent,
        }
    }

    pub const fn inserted(self) -> FastBlockStatus {
        match self {
            Pipeline::Bodies => FastBlockStatus::Inserted,
            Pipeline::Receipts => FastBlockStatus::ReceiptInserted,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Pipeline::Bodies => "bodies",
            Pipeline::Receipts => "receipts",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
