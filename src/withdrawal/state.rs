//! Withdrawal State Definitions
//!
//! State IDs are stable for PostgreSQL SMALLINT storage.

use std::fmt;

/// Withdrawal lifecycle states
///
/// Terminal states: COMPLETED (40), FAILED (-10).
/// PENDING_VERIFICATION is a parked state resolved by the verification
/// sweeper, not a terminal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum WithdrawalStatus {
    /// Created by the marketplace, funds already reserved out of the
    /// cook's withdrawable balance. Waiting for a processor run.
    Pending = 0,

    /// Processor claimed the request (persist-before-call)
    Processing = 10,

    /// Provider timed out - outcome unknown, funds stay reserved
    PendingVerification = 20,

    /// Terminal: transfer confirmed by the provider
    Completed = 40,

    /// Terminal: transfer definitively failed, reservation reversed
    Failed = -10,
}

impl WithdrawalStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Completed | WithdrawalStatus::Failed)
    }

    /// Check if funds are reserved but the outcome is still unknown
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Processing | WithdrawalStatus::PendingVerification
        )
    }

    /// Get the numeric state ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL state ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(WithdrawalStatus::Pending),
            10 => Some(WithdrawalStatus::Processing),
            20 => Some(WithdrawalStatus::PendingVerification),
            40 => Some(WithdrawalStatus::Completed),
            -10 => Some(WithdrawalStatus::Failed),
            _ => None,
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "PENDING",
            WithdrawalStatus::Processing => "PROCESSING",
            WithdrawalStatus::PendingVerification => "PENDING_VERIFICATION",
            WithdrawalStatus::Completed => "COMPLETED",
            WithdrawalStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for WithdrawalStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        WithdrawalStatus::from_id(value).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(WithdrawalStatus::Completed.is_terminal());
        assert!(WithdrawalStatus::Failed.is_terminal());

        assert!(!WithdrawalStatus::Pending.is_terminal());
        assert!(!WithdrawalStatus::Processing.is_terminal());
        assert!(!WithdrawalStatus::PendingVerification.is_terminal());
    }

    #[test]
    fn test_in_flight_states() {
        assert!(WithdrawalStatus::Processing.is_in_flight());
        assert!(WithdrawalStatus::PendingVerification.is_in_flight());

        assert!(!WithdrawalStatus::Pending.is_in_flight());
        assert!(!WithdrawalStatus::Completed.is_in_flight());
        assert!(!WithdrawalStatus::Failed.is_in_flight());
    }

    #[test]
    fn test_state_id_roundtrip() {
        let states = [
            WithdrawalStatus::Pending,
            WithdrawalStatus::Processing,
            WithdrawalStatus::PendingVerification,
            WithdrawalStatus::Completed,
            WithdrawalStatus::Failed,
        ];

        for state in states {
            let id = state.id();
            let recovered = WithdrawalStatus::from_id(id).unwrap();
            assert_eq!(state, recovered);
        }
    }

    #[test]
    fn test_invalid_state_id() {
        assert!(WithdrawalStatus::from_id(999).is_none());
        assert!(WithdrawalStatus::from_id(-999).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(WithdrawalStatus::Pending.to_string(), "PENDING");
        assert_eq!(
            WithdrawalStatus::PendingVerification.to_string(),
            "PENDING_VERIFICATION"
        );
        assert_eq!(WithdrawalStatus::Failed.to_string(), "FAILED");
    }
}
