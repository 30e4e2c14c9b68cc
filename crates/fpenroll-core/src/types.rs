use crate::{Result, error::Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Sensor device identifier reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(u64);

impl DeviceId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        DeviceId(id)
    }

    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Owning user of an enrolled template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(i32);

impl UserId {
    #[must_use]
    pub fn new(id: i32) -> Self {
        UserId(id)
    }

    #[must_use]
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Template group the driver files enrolled fingerprints under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(i32);

impl GroupId {
    #[must_use]
    pub fn new(id: i32) -> Self {
        GroupId(id)
    }

    #[must_use]
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Driver-assigned identifier of an enrolled fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FingerprintId(i32);

impl FingerprintId {
    #[must_use]
    pub fn new(id: i32) -> Self {
        FingerprintId(id)
    }

    #[must_use]
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for FingerprintId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of one enrollment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random session id.
    #[must_use]
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subject and grouping an enrolled template is associated with.
///
/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: UserId,
    pub group_id: GroupId,
    /// Client that requested the enrollment (package or process name).
    pub owner: String,
}

impl SessionIdentity {
    /// Create a session identity with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidIdentity` if the owner is empty or whitespace.
    pub fn new(user_id: UserId, group_id: GroupId, owner: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        if owner.trim().is_empty() {
            return Err(Error::InvalidIdentity(
                "owner must not be empty".to_string(),
            ));
        }

        Ok(Self {
            user_id,
            group_id,
            owner,
        })
    }
}

/// Opaque cryptographic token authorizing one enrollment.
///
/// # Security
/// The bytes are copied on construction and never exposed through `Debug`
/// or `Display`. Equality is constant-time.
#[derive(Clone, Eq)]
pub struct EnrollmentToken(Vec<u8>);

impl EnrollmentToken {
    /// Copy the caller's bytes into a new token.
    ///
    /// # Errors
    /// Returns `Error::InvalidToken` if `bytes` is empty.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidToken("token must not be empty".to_string()));
        }
        Ok(EnrollmentToken(bytes.to_vec()))
    }

    /// Raw bytes, for handing to the driver only.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for EnrollmentToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EnrollmentToken(<{} bytes redacted>)", self.0.len())
    }
}

impl PartialEq for EnrollmentToken {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

/// One progress report from the driver.
///
/// `remaining` is taken verbatim; the stream is not guaranteed to be
/// monotonic and only `remaining == 0` marks completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub fingerprint_id: FingerprintId,
    pub group_id: GroupId,
    pub remaining: i32,
    pub received_at: DateTime<Utc>,
}

impl ProgressEvent {
    /// Create a progress event stamped with the current time.
    #[must_use]
    pub fn new(fingerprint_id: FingerprintId, group_id: GroupId, remaining: i32) -> Self {
        Self {
            fingerprint_id,
            group_id,
            remaining,
            received_at: Utc::now(),
        }
    }

    /// Returns `true` if this event completes the enrollment.
    #[inline]
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.remaining == 0
    }
}

/// Error codes delivered to the client's result sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// Sensor or driver unavailable, or the driver rejected the request.
    HwUnavailable = 1,
    /// Driver could not process the current capture.
    UnableToProcess = 2,
    /// Owner-side timeout elapsed before completion.
    Timeout = 3,
    /// No room left for another template.
    NoSpace = 4,
    /// Client cancelled the session.
    Canceled = 5,
    /// Vendor-specific error; see the accompanying vendor code.
    Vendor = 8,
}

impl ErrorCode {
    /// Map a raw driver error code, folding unknown values into `Vendor`.
    #[must_use]
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => ErrorCode::HwUnavailable,
            2 => ErrorCode::UnableToProcess,
            3 => ErrorCode::Timeout,
            4 => ErrorCode::NoSpace,
            5 => ErrorCode::Canceled,
            _ => ErrorCode::Vendor,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorCode::HwUnavailable => "HW_UNAVAILABLE",
            ErrorCode::UnableToProcess => "UNABLE_TO_PROCESS",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::NoSpace => "NO_SPACE",
            ErrorCode::Canceled => "CANCELED",
            ErrorCode::Vendor => "VENDOR",
        };
        write!(f, "{name}")
    }
}

/// Capture-quality hints the driver reports between progress steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum AcquiredInfo {
    Good = 0,
    Partial = 1,
    Insufficient = 2,
    ImagerDirty = 3,
    TooSlow = 4,
    TooFast = 5,
    Vendor = 6,
}

impl AcquiredInfo {
    /// Map a raw driver acquisition code, folding unknown values into `Vendor`.
    #[must_use]
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => AcquiredInfo::Good,
            1 => AcquiredInfo::Partial,
            2 => AcquiredInfo::Insufficient,
            3 => AcquiredInfo::ImagerDirty,
            4 => AcquiredInfo::TooSlow,
            5 => AcquiredInfo::TooFast,
            _ => AcquiredInfo::Vendor,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_token_rejects_empty() {
        let result = EnrollmentToken::new(&[]);
        assert!(matches!(result, Err(Error::InvalidToken(_))));
    }

    #[test]
    fn test_token_is_copied() {
        let mut source = vec![1u8, 2, 3];
        let token = EnrollmentToken::new(&source).unwrap();
        source[0] = 9;
        assert_eq!(token.as_bytes(), &[1, 2, 3]);
        assert_eq!(token.len(), 3);
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = EnrollmentToken::new(&[0xde, 0xad, 0xbe, 0xef]).unwrap();
        let printed = format!("{token:?}");
        assert_eq!(printed, "EnrollmentToken(<4 bytes redacted>)");
        assert!(!printed.contains("de"));
    }

    #[test]
    fn test_token_equality() {
        let a = EnrollmentToken::new(&[1, 2, 3]).unwrap();
        let b = EnrollmentToken::new(&[1, 2, 3]).unwrap();
        let c = EnrollmentToken::new(&[1, 2, 4]).unwrap();
        let d = EnrollmentToken::new(&[1, 2]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_identity_rejects_blank_owner(#[case] owner: &str) {
        let result = SessionIdentity::new(UserId::new(0), GroupId::new(0), owner);
        assert!(matches!(result, Err(Error::InvalidIdentity(_))));
    }

    #[test]
    fn test_identity_valid() {
        let identity =
            SessionIdentity::new(UserId::new(10), GroupId::new(3), "com.example.settings").unwrap();
        assert_eq!(identity.user_id.as_i32(), 10);
        assert_eq!(identity.group_id.as_i32(), 3);
        assert_eq!(identity.owner, "com.example.settings");
    }

    #[rstest]
    #[case(0, true)]
    #[case(1, false)]
    #[case(5, false)]
    #[case(-1, false)]
    fn test_progress_is_final(#[case] remaining: i32, #[case] expected: bool) {
        let event = ProgressEvent::new(FingerprintId::new(7), GroupId::new(3), remaining);
        assert_eq!(event.is_final(), expected);
        assert_eq!(event.remaining, remaining);
    }

    #[rstest]
    #[case(1, ErrorCode::HwUnavailable)]
    #[case(3, ErrorCode::Timeout)]
    #[case(5, ErrorCode::Canceled)]
    #[case(42, ErrorCode::Vendor)]
    fn test_error_code_from_i32(#[case] raw: i32, #[case] expected: ErrorCode) {
        assert_eq!(ErrorCode::from_i32(raw), expected);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::Canceled.to_string(), "CANCELED");
        assert_eq!(ErrorCode::HwUnavailable.as_i32(), 1);
    }

    #[rstest]
    #[case(0, AcquiredInfo::Good)]
    #[case(2, AcquiredInfo::Insufficient)]
    #[case(99, AcquiredInfo::Vendor)]
    fn test_acquired_info_from_i32(#[case] raw: i32, #[case] expected: AcquiredInfo) {
        assert_eq!(AcquiredInfo::from_i32(raw), expected);
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_device_id_display() {
        assert_eq!(DeviceId::new(255).to_string(), "0xff");
    }

    #[test]
    fn test_progress_serialization() {
        let event = ProgressEvent::new(FingerprintId::new(7), GroupId::new(3), 5);
        let json = serde_json::to_string(&event).unwrap();
        let back: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
