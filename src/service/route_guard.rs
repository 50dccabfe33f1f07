use serde::Serialize;

use crate::models::usermodel::UserRole;

const DASHBOARD: &str = "/dashboard";
const SIGN_IN: &str = "/auth/signin";

const AUTH_ROUTES: [&str; 4] = [
    "/auth/signin",
    "/auth/signup",
    "/auth/forgot-password",
    "/auth/reset-password",
];

const ROLES: [UserRole; 3] = [UserRole::Shipper, UserRole::Carrier, UserRole::Admin];

pub fn dashboard_for(role: UserRole) -> &'static str {
    match role {
        UserRole::Shipper => "/dashboard/shipper",
        UserRole::Carrier => "/dashboard/carrier",
        UserRole::Admin => "/dashboard/admin",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Allow,
    Redirect { location: String },
}

impl GuardDecision {
    fn redirect(location: impl Into<String>) -> Self {
        GuardDecision::Redirect {
            location: location.into(),
        }
    }
}

/// `/dashboard/shipper` is under `/dashboard`, `/dashboards` is not.
fn is_under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

/// Where a browser asking for `path` should end up, given the session role.
pub fn resolve(path: &str, role: Option<UserRole>) -> GuardDecision {
    let pathname = strip_query(path);
    let route = if pathname.len() > 1 {
        pathname.trim_end_matches('/')
    } else {
        pathname
    };

    let Some(role) = role else {
        if is_under(route, DASHBOARD) {
            return GuardDecision::redirect(format!(
                "{}?redirectTo={}",
                SIGN_IN,
                urlencoding::encode(pathname)
            ));
        }
        return GuardDecision::Allow;
    };

    if AUTH_ROUTES.iter().any(|auth| is_under(route, auth)) {
        return GuardDecision::redirect(DASHBOARD);
    }

    if route == DASHBOARD {
        return GuardDecision::redirect(dashboard_for(role));
    }

    let foreign_dashboard = ROLES
        .iter()
        .any(|&owner| owner != role && is_under(route, dashboard_for(owner)));
    if foreign_dashboard {
        return GuardDecision::redirect(DASHBOARD);
    }

    GuardDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirect_to(location: &str) -> GuardDecision {
        GuardDecision::Redirect {
            location: location.to_string(),
        }
    }

    #[test]
    fn anonymous_visitor_is_sent_to_sign_in() {
        assert_eq!(
            resolve("/dashboard/carrier/bids", None),
            redirect_to("/auth/signin?redirectTo=%2Fdashboard%2Fcarrier%2Fbids")
        );
        assert_eq!(resolve("/dashboard", None), redirect_to("/auth/signin?redirectTo=%2Fdashboard"));
    }

    #[test]
    fn sign_in_redirect_keeps_only_the_pathname() {
        assert_eq!(
            resolve("/dashboard/shipper/requests?status=open#top", None),
            redirect_to("/auth/signin?redirectTo=%2Fdashboard%2Fshipper%2Frequests")
        );
    }

    #[test]
    fn anonymous_visitor_may_browse_public_pages() {
        assert_eq!(resolve("/", None), GuardDecision::Allow);
        assert_eq!(resolve("/auth/signin", None), GuardDecision::Allow);
        assert_eq!(resolve("/dashboards-tour", None), GuardDecision::Allow);
    }

    #[test]
    fn signed_in_user_skips_auth_pages() {
        assert_eq!(resolve("/auth/signup", Some(UserRole::Carrier)), redirect_to("/dashboard"));
        assert_eq!(
            resolve("/auth/reset-password?token=abc", Some(UserRole::Shipper)),
            redirect_to("/dashboard")
        );
    }

    #[test]
    fn bare_dashboard_goes_to_role_home() {
        assert_eq!(resolve("/dashboard", Some(UserRole::Shipper)), redirect_to("/dashboard/shipper"));
        assert_eq!(resolve("/dashboard/", Some(UserRole::Carrier)), redirect_to("/dashboard/carrier"));
        assert_eq!(resolve("/dashboard", Some(UserRole::Admin)), redirect_to("/dashboard/admin"));
    }

    #[test]
    fn other_roles_dashboards_are_off_limits() {
        assert_eq!(resolve("/dashboard/shipper/requests", Some(UserRole::Carrier)), redirect_to("/dashboard"));
        assert_eq!(resolve("/dashboard/admin", Some(UserRole::Shipper)), redirect_to("/dashboard"));
        assert_eq!(resolve("/dashboard/carrier/bids", Some(UserRole::Carrier)), GuardDecision::Allow);
        assert_eq!(resolve("/dashboard/chat/42", Some(UserRole::Shipper)), GuardDecision::Allow);
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_value(redirect_to("/dashboard")).unwrap();
        assert_eq!(json, serde_json::json!({ "decision": "redirect", "location": "/dashboard" }));
        let json = serde_json::to_value(GuardDecision::Allow).unwrap();
        assert_eq!(json, serde_json::json!({ "decision": "allow" }));
    }
}
