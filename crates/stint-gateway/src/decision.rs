//! Gateway decisions and route classification.

use stint_idp::UserProfile;

use crate::config::GatewayConfig;

/// What the gateway decided to do with one request.
///
/// Exactly one decision is produced per request; transport adapters map it
/// onto their response type and never second-guess it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayDecision {
    /// Let the request through without identity.
    Allow,
    /// Let the request through, annotated with the verified profile.
    AllowWithIdentity(UserProfile),
    /// Send the caller to `target` instead of serving the request.
    Redirect(String),
    /// Let the request through and drop every credential slot on the way out.
    ClearAndAllow,
}

impl GatewayDecision {
    /// Whether the inner handler runs for this decision.
    pub fn passes_through(&self) -> bool {
        !matches!(self, Self::Redirect(_))
    }
}

/// How a path is treated by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Never guarded; the gateway stays out of the way.
    Public,
    /// Login and related screens; authenticated callers are bounced into
    /// the app.
    AuthPage,
    /// Requires a live session.
    Protected,
}

/// Classify a request path.
///
/// A leading configured locale segment is stripped first, so `/de/tasks`
/// and `/tasks` classify identically. The access-denied page is public even
/// though it sits among app routes. Anything matching no configured prefix
/// passes through untouched; an unlisted route must never get locked behind
/// the gateway by accident.
pub fn classify_route(path: &str, config: &GatewayConfig) -> RouteClass {
    let path = strip_locale(path, &config.locales);

    if matches_prefix(path, &config.unauthorized_path) {
        return RouteClass::Public;
    }
    if config
        .auth_prefixes
        .iter()
        .any(|prefix| matches_prefix(path, prefix))
    {
        return RouteClass::AuthPage;
    }
    if config
        .protected_prefixes
        .iter()
        .any(|prefix| matches_prefix(path, prefix))
    {
        return RouteClass::Protected;
    }
    RouteClass::Public
}

/// Segment-aligned prefix match: `/tasks` covers `/tasks` and `/tasks/42`,
/// never `/tasksXYZ`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn strip_locale<'a>(path: &'a str, locales: &[String]) -> &'a str {
    for locale in locales {
        if let Some(rest) = path.strip_prefix('/').and_then(|p| p.strip_prefix(locale.as_str())) {
            if rest.is_empty() {
                return "/";
            }
            if rest.starts_with('/') {
                return rest;
            }
        }
    }
    path
}
