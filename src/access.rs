//! Request authorization for the web and API surfaces.
//!
//! One resolution function decides who is making a request; one decision
//! function says whether they may proceed. Neither touches the database or
//! mutates session state.

use std::collections::BTreeMap;

use crate::settings::{AuthModeSetting, AuthSettings};

pub const DEMO_DENIED_MESSAGE: &str = "Demo users cannot access this feature";
const DEFAULT_DENY_REDIRECT: &str = "/dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Session,
    /// Development only: unauthenticated page requests act as `user`.
    DevAutoLogin { user: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    Session,
    DevAutoLogin,
    ApiToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user: String,
    pub is_demo: bool,
    pub via: AuthSource,
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub path: String,
    pub session_user: Option<String>,
    pub bearer_token: Option<String>,
    /// JSON API request rather than a page render.
    pub is_api: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Authorized(Principal),
    DenyRedirect { location: String, message: String },
    RequireLogin,
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub mode: AuthMode,
    /// Token -> user name.
    pub api_tokens: BTreeMap<String, String>,
    pub demo_users: Vec<String>,
    /// Route prefixes demo users may not open.
    pub demo_restricted: Vec<String>,
    pub deny_redirect: String,
}

impl AccessPolicy {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            api_tokens: BTreeMap::new(),
            demo_users: Vec::new(),
            demo_restricted: Vec::new(),
            deny_redirect: DEFAULT_DENY_REDIRECT.to_string(),
        }
    }

    pub fn from_settings(auth: &AuthSettings) -> Self {
        let mode = match (&auth.mode, &auth.dev_user) {
            (AuthModeSetting::DevAutoLogin, Some(user)) if !user.trim().is_empty() => {
                AuthMode::DevAutoLogin { user: user.trim().to_string() }
            }
            (AuthModeSetting::DevAutoLogin, _) => {
                tracing::warn!("dev_auto_login configured without dev_user; falling back to session auth");
                AuthMode::Session
            }
            (AuthModeSetting::Session, _) => AuthMode::Session,
        };
        let mut policy = Self::new(mode);
        policy.api_tokens = auth.api_tokens.clone();
        policy.demo_users = auth.demo_users.clone();
        policy.demo_restricted = auth.demo_restricted.clone();
        policy
    }

    fn is_demo(&self, user: &str) -> bool {
        self.demo_users.iter().any(|d| d.eq_ignore_ascii_case(user))
    }

    fn principal(&self, user: &str, via: AuthSource) -> Principal {
        Principal {
            user: user.to_string(),
            is_demo: self.is_demo(user),
            via,
        }
    }

    /// Work out who is making the request, if anyone.
    pub fn resolve(&self, ctx: &RequestContext) -> Option<Principal> {
        if ctx.is_api {
            let token = ctx.bearer_token.as_deref()?.trim();
            return self
                .api_tokens
                .get(token)
                .map(|user| self.principal(user, AuthSource::ApiToken));
        }

        if let Some(user) = ctx.session_user.as_deref().filter(|u| !u.is_empty()) {
            return Some(self.principal(user, AuthSource::Session));
        }

        match &self.mode {
            AuthMode::DevAutoLogin { user } => Some(self.principal(user, AuthSource::DevAutoLogin)),
            AuthMode::Session => None,
        }
    }

    fn is_restricted(&self, path: &str) -> bool {
        self.demo_restricted.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
        })
    }

    pub fn authorize(&self, ctx: &RequestContext) -> AuthDecision {
        let Some(principal) = self.resolve(ctx) else {
            tracing::debug!(path = %ctx.path, "unauthenticated request");
            return AuthDecision::RequireLogin;
        };

        if principal.is_demo && self.is_restricted(&ctx.path) {
            tracing::info!(user = %principal.user, path = %ctx.path, "demo user denied");
            return AuthDecision::DenyRedirect {
                location: self.deny_redirect.clone(),
                message: DEMO_DENIED_MESSAGE.to_string(),
            };
        }

        AuthDecision::Authorized(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(mode: AuthMode) -> AccessPolicy {
        let mut p = AccessPolicy::new(mode);
        p.api_tokens.insert("tok-alice".to_string(), "alice".to_string());
        p.api_tokens.insert("tok-demo".to_string(), "demo@example.com".to_string());
        p.demo_users.push("demo@example.com".to_string());
        p.demo_restricted.push("/simplefin".to_string());
        p.demo_restricted.push("/api/simplefin/".to_string());
        p
    }

    fn page(path: &str, user: Option<&str>) -> RequestContext {
        RequestContext {
            path: path.to_string(),
            session_user: user.map(str::to_string),
            ..RequestContext::default()
        }
    }

    fn api(path: &str, token: Option<&str>) -> RequestContext {
        RequestContext {
            path: path.to_string(),
            bearer_token: token.map(str::to_string),
            is_api: true,
            ..RequestContext::default()
        }
    }

    #[test]
    fn test_session_user_is_authorized() {
        let decision = policy(AuthMode::Session).authorize(&page("/transactions", Some("alice")));
        match decision {
            AuthDecision::Authorized(p) => {
                assert_eq!(p.user, "alice");
                assert_eq!(p.via, AuthSource::Session);
                assert!(!p.is_demo);
            }
            other => panic!("expected authorized, got {other:?}"),
        }
    }

    #[test]
    fn test_anonymous_requires_login() {
        let p = policy(AuthMode::Session);
        assert_eq!(p.authorize(&page("/transactions", None)), AuthDecision::RequireLogin);
        assert_eq!(p.authorize(&page("/transactions", Some(""))), AuthDecision::RequireLogin);
    }

    #[test]
    fn test_dev_auto_login_fills_in_user() {
        let p = policy(AuthMode::DevAutoLogin { user: "dev@example.com".to_string() });
        let principal = p.resolve(&page("/budgets", None)).unwrap();
        assert_eq!(principal.user, "dev@example.com");
        assert_eq!(principal.via, AuthSource::DevAutoLogin);
        // A real session still wins.
        assert_eq!(p.resolve(&page("/budgets", Some("alice"))).unwrap().via, AuthSource::Session);
    }

    #[test]
    fn test_dev_auto_login_does_not_cover_api() {
        let p = policy(AuthMode::DevAutoLogin { user: "dev@example.com".to_string() });
        assert_eq!(p.authorize(&api("/api/accounts", None)), AuthDecision::RequireLogin);
    }

    #[test]
    fn test_api_token() {
        let p = policy(AuthMode::Session);
        let principal = p.resolve(&api("/api/accounts", Some("tok-alice"))).unwrap();
        assert_eq!(principal.user, "alice");
        assert_eq!(principal.via, AuthSource::ApiToken);
        assert_eq!(p.authorize(&api("/api/accounts", Some("wrong"))), AuthDecision::RequireLogin);
    }

    #[test]
    fn test_api_ignores_session_cookie() {
        let p = policy(AuthMode::Session);
        let mut ctx = api("/api/accounts", None);
        ctx.session_user = Some("alice".to_string());
        assert_eq!(p.authorize(&ctx), AuthDecision::RequireLogin);
    }

    #[test]
    fn test_demo_user_redirected_from_restricted_route() {
        let p = policy(AuthMode::Session);
        let decision = p.authorize(&page("/simplefin/connect", Some("Demo@Example.com")));
        assert_eq!(
            decision,
            AuthDecision::DenyRedirect {
                location: "/dashboard".to_string(),
                message: DEMO_DENIED_MESSAGE.to_string(),
            }
        );
        let decision = p.authorize(&api("/api/simplefin/sync", Some("tok-demo")));
        assert!(matches!(decision, AuthDecision::DenyRedirect { .. }));
    }

    #[test]
    fn test_demo_user_allowed_elsewhere() {
        let p = policy(AuthMode::Session);
        let decision = p.authorize(&page("/transactions", Some("demo@example.com")));
        match decision {
            AuthDecision::Authorized(principal) => assert!(principal.is_demo),
            other => panic!("expected authorized, got {other:?}"),
        }
        // Prefix must end on a path boundary.
        assert!(matches!(
            p.authorize(&page("/simplefinancial", Some("demo@example.com"))),
            AuthDecision::Authorized(_)
        ));
    }

    #[test]
    fn test_non_demo_user_reaches_restricted_route() {
        let p = policy(AuthMode::Session);
        assert!(matches!(
            p.authorize(&page("/simplefin", Some("alice"))),
            AuthDecision::Authorized(_)
        ));
    }

    #[test]
    fn test_from_settings() {
        let mut auth = AuthSettings::default();
        auth.mode = AuthModeSetting::DevAutoLogin;
        auth.dev_user = Some("dev".to_string());
        let p = AccessPolicy::from_settings(&auth);
        assert_eq!(p.mode, AuthMode::DevAutoLogin { user: "dev".to_string() });
        assert!(p.demo_restricted.contains(&"/simplefin".to_string()));

        auth.dev_user = None;
        assert_eq!(AccessPolicy::from_settings(&auth).mode, AuthMode::Session);
    }
}
