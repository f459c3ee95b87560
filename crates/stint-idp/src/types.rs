//! Wire models shared with the identity provider.

use serde::{Deserialize, Serialize};

/// Profile of an authenticated user, as reported by the identity provider.
///
/// Forwarded verbatim to the upstream application in the identity header, so
/// the field names here are the product's wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable user identifier.
    pub id: String,
    /// Primary email address.
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Workspace the session is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

impl UserProfile {
    /// Create a profile with just the required fields.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            workspace_id: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the workspace scope.
    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }
}

/// Response body of a refresh call.
///
/// Only the two tokens are read; anything else the provider includes is
/// ignored on decode. A grant that carries no access token means the refresh
/// session itself is no longer valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshGrant {
    /// Newly minted access token, absent when the provider declined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Rotated refresh token, absent when the provider keeps the old one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl RefreshGrant {
    /// Create a grant carrying a new access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..Self::default()
        }
    }

    /// Attach a rotated refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}
