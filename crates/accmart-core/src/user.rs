//! User types for accmart.
//!
//! A user row is created on first sign-in sync and carries the wallet balance.
//! Only the purchase and deposit engines change the balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Rejection, Result};
use crate::UserId;

/// A marketplace user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user ID (from the identity provider).
    pub id: UserId,

    /// Sign-in email.
    pub email: String,

    /// Given name.
    pub first_name: Option<String>,

    /// Family name.
    pub last_name: Option<String>,

    /// Avatar URL.
    pub profile_image_url: Option<String>,

    /// Spendable balance in wallet units. Never negative.
    pub wallet_balance: i64,

    /// Whether the user may use admin endpoints.
    pub is_admin: bool,

    /// When the user was first synced.
    pub created_at: DateTime<Utc>,

    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new non-admin user with an empty wallet.
    #[must_use]
    pub fn new(profile: UserProfile) -> Self {
        let now = Utc::now();
        Self {
            id: profile.id,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            profile_image_url: profile.profile_image_url,
            wallet_balance: 0,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the wallet covers an amount.
    #[must_use]
    pub fn has_sufficient_balance(&self, amount: i64) -> bool {
        self.wallet_balance >= amount
    }

    /// Apply a profile sync. Balance and admin flag are left alone.
    pub fn apply_profile(&mut self, profile: UserProfile) {
        self.email = profile.email;
        self.first_name = profile.first_name;
        self.last_name = profile.last_name;
        self.profile_image_url = profile.profile_image_url;
        self.updated_at = Utc::now();
    }
}

/// Profile data synced from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// The user ID.
    pub id: UserId,
    /// Sign-in email.
    pub email: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Avatar URL.
    pub profile_image_url: Option<String>,
}

/// Check whether an admin-status change on `target` may go ahead.
///
/// Demotions are refused for protected emails and for the last remaining admin.
/// Promotions and no-op changes are always allowed.
///
/// # Errors
///
/// Returns `ProtectedAdmin` or `LastAdmin`.
pub fn ensure_admin_change_allowed(
    target: &User,
    make_admin: bool,
    admin_count: usize,
    protected_emails: &[String],
) -> Result<()> {
    if make_admin || !target.is_admin {
        return Ok(());
    }
    if protected_emails
        .iter()
        .any(|email| email.eq_ignore_ascii_case(&target.email))
    {
        return Err(Rejection::ProtectedAdmin);
    }
    if admin_count <= 1 {
        return Err(Rejection::LastAdmin);
    }
    Ok(())
}
