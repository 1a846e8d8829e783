/// file: src/mode.rs
/// description: user/admin view mode toggle gated by an external authorizer
use crate::error::EventlyError;
use async_trait::async_trait;
use std::fmt;
use tracing::{info, warn};

/// Proof that the operator passed the admin check. Admin backend calls
/// require one, and the key it carries is forwarded to the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminGrant {
    api_key: String,
}

impl AdminGrant {
    pub(crate) fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for AdminGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminGrant")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait AdminAuthorizer: Send + Sync {
    async fn authorize(&self, credential: &str) -> Result<AdminGrant, EventlyError>;
}

/// Accepts the operator-configured admin API key.
///
/// With no key configured every attempt is denied; there is no built-in
/// fallback password.
pub struct ApiKeyAuthorizer {
    expected: Option<String>,
}

impl ApiKeyAuthorizer {
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|key| !key.trim().is_empty()),
        }
    }
}

#[async_trait]
impl AdminAuthorizer for ApiKeyAuthorizer {
    async fn authorize(&self, credential: &str) -> Result<AdminGrant, EventlyError> {
        let Some(expected) = &self.expected else {
            return Err(EventlyError::AuthorizationDenied {
                reason: "no admin key configured (set EVENTLY_ADMIN_KEY)".to_string(),
            });
        };

        let credential = credential.trim();
        if credential.is_empty()
            || !constant_time_eq::constant_time_eq(credential.as_bytes(), expected.as_bytes())
        {
            return Err(EventlyError::AuthorizationDenied {
                reason: "invalid admin key".to_string(),
            });
        }

        Ok(AdminGrant::new(credential))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    User,
    Admin(AdminGrant),
}

impl ViewMode {
    pub fn is_admin(&self) -> bool {
        matches!(self, ViewMode::Admin(_))
    }

    pub fn grant(&self) -> Option<&AdminGrant> {
        match self {
            ViewMode::Admin(grant) => Some(grant),
            ViewMode::User => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::User => "USER",
            ViewMode::Admin(_) => "ADMIN",
        }
    }
}

/// Identifies one listing refresh; only the latest one may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefreshToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshPlan {
    Events,
    EventsAndAnalytics(AdminGrant),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub token: RefreshToken,
    pub plan: RefreshPlan,
}

#[derive(Debug)]
pub struct ModeToggle {
    mode: ViewMode,
    refresh: RefreshToken,
}

impl Default for ModeToggle {
    fn default() -> Self {
        Self {
            mode: ViewMode::User,
            refresh: RefreshToken(0),
        }
    }
}

impl ModeToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    pub fn is_current(&self, token: RefreshToken) -> bool {
        self.refresh == token
    }

    /// Issues a refresh for the current mode, superseding any in flight.
    pub fn refresh(&mut self) -> RefreshRequest {
        self.refresh = RefreshToken(self.refresh.0 + 1);
        let plan = match &self.mode {
            ViewMode::User => RefreshPlan::Events,
            ViewMode::Admin(grant) => RefreshPlan::EventsAndAnalytics(grant.clone()),
        };
        RefreshRequest {
            token: self.refresh,
            plan,
        }
    }

    pub fn enter_user(&mut self) -> RefreshRequest {
        if self.mode.is_admin() {
            info!("Leaving admin mode");
        }
        self.mode = ViewMode::User;
        crate::monitoring::ADMIN_MODE_GAUGE.set(0.0);
        self.refresh()
    }

    /// Asks the authorizer for a grant; on denial the mode and the current
    /// refresh token are left untouched.
    pub async fn enter_admin(
        &mut self,
        authorizer: &dyn AdminAuthorizer,
        credential: &str,
    ) -> Result<RefreshRequest, EventlyError> {
        match authorizer.authorize(credential).await {
            Ok(grant) => {
                info!("Entering admin mode");
                self.mode = ViewMode::Admin(grant);
                crate::monitoring::ADMIN_MODE_GAUGE.set(1.0);
                Ok(self.refresh())
            }
            Err(e) => {
                warn!(error = %e, "Admin mode denied");
                Err(e)
            }
        }
    }
}
