//! Type-safe identifiers and return codes.
//!
//! Newtype wrappers keep correlation ids and acknowledgement codes from
//! being mixed with ordinary integers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// RequestId
// ============================================================================

/// Correlation id linking an outbound request to its acknowledgement.
///
/// Id zero is reserved: it marks fire-and-forget operations and is used
/// internally to correlate the `Connect` handshake with its `Connected` reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RequestId(u32);

impl RequestId {
    /// Id used for fire-and-forget operations and the connect handshake.
    pub const CONNECT: Self = Self(0);

    /// Creates a request id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns `true` if operations sent with this id wait for an acknowledgement.
    #[inline]
    #[must_use]
    pub const fn is_correlated(self) -> bool {
        self.0 != 0
    }

    pub(crate) fn is_uncorrelated(&self) -> bool {
        !self.is_correlated()
    }
}

impl From<u32> for RequestId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ReturnCode
// ============================================================================

/// Outcome of a correlated request.
///
/// `0` is success, a negative value means no answer arrived before the
/// local deadline, and a positive value is an error code reported by the
/// server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReturnCode(i32);

impl ReturnCode {
    /// The request succeeded.
    pub const SUCCESS: Self = Self(0);

    /// No acknowledgement arrived before the deadline.
    pub const TIMEOUT: Self = Self(-1);

    /// Wraps a raw code.
    #[inline]
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Returns the raw code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Returns `true` for a successful acknowledgement.
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the wait expired locally.
    #[inline]
    #[must_use]
    pub const fn is_timeout(self) -> bool {
        self.0 < 0
    }

    /// Returns the server's error code, if any.
    #[inline]
    #[must_use]
    pub const fn remote_error(self) -> Option<i32> {
        if self.0 > 0 { Some(self.0) } else { None }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rc={}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_id_is_uncorrelated() {
        assert!(!RequestId::CONNECT.is_correlated());
        assert!(RequestId::new(7).is_correlated());
    }

    #[test]
    fn test_full_u32_range_serializes() {
        let json = serde_json::to_string(&RequestId::new(u32::MAX)).unwrap();
        assert_eq!(json, "4294967295");
    }

    #[test]
    fn test_request_id_serializes_as_number() {
        let json = serde_json::to_string(&RequestId::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_return_code_classes() {
        assert!(ReturnCode::SUCCESS.is_success());
        assert!(ReturnCode::TIMEOUT.is_timeout());
        assert_eq!(ReturnCode::TIMEOUT.remote_error(), None);
        assert_eq!(ReturnCode::new(160).remote_error(), Some(160));
        assert!(!ReturnCode::new(160).is_timeout());
    }
}
