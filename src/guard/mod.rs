//! Page routing and guards driven by the registration gate

use crate::domain::IdentitySession;
use crate::gate::GateDecision;
use serde::Serialize;
use std::fmt;

/// Application pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "page", content = "id", rename_all = "snake_case")]
pub enum Route {
    Home,
    Login,
    Register,
    Profile,
    Topic(i64),
}

impl Route {
    /// Map a path to a page; unknown paths land on the home page
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');

        match trimmed {
            "" => Route::Home,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/profile" => Route::Profile,
            other => other
                .strip_prefix("/topic/")
                .and_then(|id| id.parse::<i64>().ok())
                .map(Route::Topic)
                .unwrap_or(Route::Home),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Topic(id) => format!("/topic/{}", id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Why a page cannot render yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingReason {
    /// The identity provider is still loading
    Initializing,
    /// The provisioning check is in flight
    CheckingUser,
}

/// What a page may show once rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PageAccess {
    /// Write-capable actions (new topic, new message)
    pub can_write: bool,
    /// Anonymous visitors read the public topic listing
    pub public_listing: bool,
    /// Show a banner asking the user to finish registration
    pub registration_banner: bool,
    /// Registration form cannot be prefilled from the identity
    pub missing_profile_data: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardOutcome {
    Render(PageAccess),
    Redirect { to: Route },
    Pending { reason: PendingReason },
    /// Anonymous visitor on a page that needs a session
    RequireLogin,
}

impl GuardOutcome {
    fn redirect(to: Route) -> Self {
        GuardOutcome::Redirect { to }
    }

    fn pending(session: &IdentitySession) -> Self {
        let reason = if session.is_loading {
            PendingReason::Initializing
        } else {
            PendingReason::CheckingUser
        };
        GuardOutcome::Pending { reason }
    }
}

/// Decide what `route` should do for the given session and gate decision
pub fn evaluate(route: Route, session: &IdentitySession, decision: &GateDecision) -> GuardOutcome {
    let authenticated = session.is_authenticated;
    let busy = session.is_loading || decision.is_checking_user;

    match route {
        Route::Login => {
            if authenticated && !decision.is_checking_user && !session.is_loading {
                if decision.needs_registration {
                    GuardOutcome::redirect(Route::Register)
                } else {
                    GuardOutcome::redirect(Route::Home)
                }
            } else if authenticated {
                GuardOutcome::pending(session)
            } else {
                GuardOutcome::Render(PageAccess::default())
            }
        }
        Route::Register => {
            if decision.is_fully_registered {
                GuardOutcome::redirect(Route::Home)
            } else if busy {
                GuardOutcome::pending(session)
            } else if !authenticated {
                GuardOutcome::RequireLogin
            } else {
                let has_profile = session
                    .identity
                    .as_ref()
                    .is_some_and(|identity| identity.has_profile_data());
                GuardOutcome::Render(PageAccess {
                    missing_profile_data: !has_profile,
                    ..Default::default()
                })
            }
        }
        Route::Home => {
            if decision.needs_registration {
                GuardOutcome::redirect(Route::Register)
            } else if busy {
                GuardOutcome::pending(session)
            } else {
                GuardOutcome::Render(PageAccess {
                    can_write: decision.is_fully_registered,
                    public_listing: !authenticated,
                    ..Default::default()
                })
            }
        }
        Route::Topic(_) => {
            if authenticated && decision.needs_registration {
                GuardOutcome::redirect(Route::Register)
            } else {
                GuardOutcome::Render(PageAccess {
                    can_write: decision.is_fully_registered,
                    ..Default::default()
                })
            }
        }
        Route::Profile => {
            if !authenticated {
                GuardOutcome::RequireLogin
            } else {
                GuardOutcome::Render(PageAccess {
                    can_write: decision.is_fully_registered,
                    registration_banner: decision.needs_registration,
                    ..Default::default()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identity;
    use crate::gate::ProvisioningResult;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn full_identity() -> Identity {
        Identity::new("auth0|abc")
            .with_email("ana@example.com")
            .with_name("Ana")
    }

    fn decision(result: ProvisioningResult, checking: bool) -> GateDecision {
        GateDecision::compute(true, false, result, checking)
    }

    #[rstest]
    #[case("/", Route::Home)]
    #[case("", Route::Home)]
    #[case("/login", Route::Login)]
    #[case("/register/", Route::Register)]
    #[case("/profile?tab=topics", Route::Profile)]
    #[case("/topic/42", Route::Topic(42))]
    #[case("/topic/abc", Route::Home)]
    #[case("/nowhere", Route::Home)]
    fn test_route_parse(#[case] path: &str, #[case] expected: Route) {
        assert_eq!(Route::parse(path), expected);
    }

    #[test]
    fn test_route_path_roundtrip() {
        for route in [Route::Home, Route::Login, Route::Register, Route::Profile, Route::Topic(7)] {
            assert_eq!(Route::parse(&route.path()), route);
        }
    }

    #[test]
    fn test_login_redirects_by_registration() {
        let session = IdentitySession::authenticated(full_identity());

        assert_eq!(
            evaluate(Route::Login, &session, &decision(ProvisioningResult::Absent, false)),
            GuardOutcome::Redirect { to: Route::Register }
        );
        assert_eq!(
            evaluate(Route::Login, &session, &decision(ProvisioningResult::Present, false)),
            GuardOutcome::Redirect { to: Route::Home }
        );
        assert_eq!(
            evaluate(Route::Login, &session, &decision(ProvisioningResult::Unknown, true)),
            GuardOutcome::Pending { reason: PendingReason::CheckingUser }
        );
        assert_eq!(
            evaluate(Route::Login, &IdentitySession::anonymous(), &GateDecision::default()),
            GuardOutcome::Render(PageAccess::default())
        );
    }

    #[test]
    fn test_register_page() {
        let session = IdentitySession::authenticated(full_identity());

        assert_eq!(
            evaluate(Route::Register, &session, &decision(ProvisioningResult::Present, false)),
            GuardOutcome::Redirect { to: Route::Home }
        );
        assert_eq!(
            evaluate(Route::Register, &IdentitySession::loading(), &GateDecision::default()),
            GuardOutcome::Pending { reason: PendingReason::Initializing }
        );
        assert_eq!(
            evaluate(Route::Register, &IdentitySession::anonymous(), &GateDecision::default()),
            GuardOutcome::RequireLogin
        );
        assert_eq!(
            evaluate(Route::Register, &session, &decision(ProvisioningResult::Absent, false)),
            GuardOutcome::Render(PageAccess::default())
        );

        let bare = IdentitySession::authenticated(Identity::new("auth0|abc"));
        assert_eq!(
            evaluate(Route::Register, &bare, &decision(ProvisioningResult::Absent, false)),
            GuardOutcome::Render(PageAccess {
                missing_profile_data: true,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_home_page() {
        let session = IdentitySession::authenticated(full_identity());

        assert_eq!(
            evaluate(Route::Home, &session, &decision(ProvisioningResult::Absent, false)),
            GuardOutcome::Redirect { to: Route::Register }
        );
        assert_eq!(
            evaluate(Route::Home, &session, &decision(ProvisioningResult::Unknown, true)),
            GuardOutcome::Pending { reason: PendingReason::CheckingUser }
        );
        assert_eq!(
            evaluate(Route::Home, &session, &decision(ProvisioningResult::Present, false)),
            GuardOutcome::Render(PageAccess {
                can_write: true,
                ..Default::default()
            })
        );
        assert_eq!(
            evaluate(Route::Home, &IdentitySession::anonymous(), &GateDecision::default()),
            GuardOutcome::Render(PageAccess {
                public_listing: true,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_topic_page_write_access() {
        let session = IdentitySession::authenticated(full_identity());

        assert_eq!(
            evaluate(Route::Topic(1), &session, &decision(ProvisioningResult::Absent, false)),
            GuardOutcome::Redirect { to: Route::Register }
        );
        assert_eq!(
            evaluate(Route::Topic(1), &session, &decision(ProvisioningResult::Unknown, true)),
            GuardOutcome::Render(PageAccess::default())
        );
        assert_eq!(
            evaluate(Route::Topic(1), &session, &decision(ProvisioningResult::Present, false)),
            GuardOutcome::Render(PageAccess {
                can_write: true,
                ..Default::default()
            })
        );
        assert_eq!(
            evaluate(Route::Topic(1), &IdentitySession::anonymous(), &GateDecision::default()),
            GuardOutcome::Render(PageAccess::default())
        );
    }

    #[test]
    fn test_profile_requires_login() {
        assert_eq!(
            evaluate(Route::Profile, &IdentitySession::anonymous(), &GateDecision::default()),
            GuardOutcome::RequireLogin
        );
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_value(GuardOutcome::Redirect { to: Route::Topic(3) }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "outcome": "redirect", "to": { "page": "topic", "id": 3 } })
        );
    }
}
