/// Per-block sync status.
///
/// Bodies move `Pending -> RequestSent -> Inserted`. Receipts are layered on
/// top of an inserted body and move `Inserted -> ReceiptRequestSent -> ReceiptInserted`.
/// Each value fits in three bits; the discriminants are the stored bit patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FastBlockStatus {
    /// Nothing requested yet.
    #[default]
    Pending = 0,
    /// Body request handed to a feed.
    RequestSent = 1,
    /// Body durably stored.
    Inserted = 2,
    /// Receipts request handed to a feed.
    ReceiptRequestSent = 3,
    /// Receipts durably stored. Terminal.
    ReceiptInserted = 4,
}

impl FastBlockStatus {
    pub const ALL: [FastBlockStatus; 5] = [
        FastBlockStatus::Pending,
        FastBlockStatus::RequestSent,
        FastBlockStatus::Inserted,
        FastBlockStatus::ReceiptRequestSent,
        FastBlockStatus::ReceiptInserted,
    ];

    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(FastBlockStatus::Pending),
            1 => Some(FastBlockStatus::RequestSent),
            2 => Some(FastBlockStatus::Inserted),
            3 => Some(FastBlockStatus::ReceiptRequestSent),
            4 => Some(FastBlockStatus::ReceiptInserted),
            _ => None,
        }
    }

    /// Check if moving from this status to `target` is legal.
    ///
    /// The only backward edges are the two that abandon an in-flight request.
    /// No status may transition to itself.
    pub const fn can_transition_to(self, target: FastBlockStatus) -> bool {
        use FastBlockStatus::*;
        match self {
            Pending => matches!(target, RequestSent),
            RequestSent => matches!(target, Pending | Inserted),
            Inserted => matches!(target, ReceiptRequestSent),
            ReceiptRequestSent => matches!(target, ReceiptInserted | Inserted),
            ReceiptInserted => false,
        }
    }
}
