use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// OTP code length in decimal digits.
pub const OTP_CODE_LEN: usize = 6;

/// OTP time-to-live in seconds (10 minutes).
pub const OTP_TTL_SECS: i64 = 600;

/// Safety margin subtracted from token expiry checks so a token is never
/// used when it would expire mid-flight.
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

/// Provider-side cap on track URIs per playlist mutation call.
pub const TRACK_BATCH_LIMIT: usize = 100;

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    New,
    Pending,
    Complete,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "pending" => Some(Self::Pending),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

/// A user anchored to an E.164 phone number. Created on the first OTP
/// request for an unseen number; `Complete` (reached by verifying an OTP)
/// gates account linking.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub phone_number: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── OTP requests ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpStatus {
    Pending,
    Expired,
}

impl OtpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// One issued passcode. At most one `Pending` row exists per user; rows are
/// superseded or consumed by moving to `Expired`, never deleted.
#[derive(Debug, Clone)]
pub struct OtpRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    /// 6 ASCII digits, leading zeros significant.
    pub code: String,
    pub status: OtpStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a verification attempt. A result, not an error: callers must
/// handle every case, and nothing beyond the variant distinguishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Accepted,
    Expired,
    Mismatch,
    NoActiveRequest,
}

impl VerifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::Mismatch => "mismatch",
            Self::NoActiveRequest => "no_active_request",
        }
    }
}

// ── Linked accounts ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    New,
    Complete,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

/// Link between a user and their Spotify identity. One per user.
#[derive(Debug, Clone)]
pub struct LinkedAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── OAuth tokens ─────────────────────────────────────────────────────────────

/// Delegated credential for a linked account. Exactly one row per account is
/// `active` at any instant; rotation supersedes, it never mutates in place.
///
/// `access_token` and `refresh_token` are secrets — never log them and never
/// put them in API responses.
#[derive(Debug, Clone)]
pub struct OAuthToken {
    pub id: Uuid,
    pub account_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub scope: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthToken {
    /// True when the token should no longer be used at `now`. The skew pulls
    /// the cutoff forward so a token never expires mid-flight.
    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now >= self.expires_at - skew
    }
}

/// Result of an atomic token rotation. `Lost` means a concurrent rotation
/// already superseded the expected row; nothing was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOutcome {
    Stored,
    Lost,
}
