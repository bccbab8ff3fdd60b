//! Room entity definitions

use serde::{Deserialize, Serialize};

/// A fixed two-party conversation scoped to one listing.
///
/// The triple (listing, lender, borrower) is unique and immutable after
/// creation; membership never changes and rooms are never deleted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i64,
    pub listing_id: i64,
    pub lender_id: i64,
    pub borrower_id: i64,
    pub created_at: String,
}

impl Room {
    /// The counterparty of `user_id` in this room.
    ///
    /// Matches the lender first; any other id (including a non-member)
    /// resolves to the lender as the partner.
    pub fn other_party(&self, user_id: i64) -> i64 {
        if self.lender_id == user_id {
            self.borrower_id
        } else {
            self.lender_id
        }
    }
}
