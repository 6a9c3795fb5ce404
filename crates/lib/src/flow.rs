//! Three-screen flow: Landing → Chat → Results.
//!
//! The profile reaches the results screen only through a [`Handoff`] passed at navigation
//! time. Nothing is looked up from a route or a store, so a results screen opened without
//! one has nothing to show and sends the user back to the landing screen.

use crate::driver::{ConversationDriver, Dispatch, Handoff};
use crate::profile::PersonalityProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Landing,
    Chat,
    Results,
}

impl Route {
    /// Map a path to a route. Unknown paths land on the landing screen.
    pub fn from_path(path: &str) -> Self {
        match path.trim().trim_end_matches('/') {
            "/chat" | "chat" => Route::Chat,
            "/results" | "results" => Route::Results,
            _ => Route::Landing,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Chat => "/chat",
            Route::Results => "/results",
        }
    }
}

/// The active screen and the state it owns.
#[derive(Debug, Default)]
pub enum Screen {
    #[default]
    Landing,
    Chat(ConversationDriver),
    Results(PersonalityProfile),
}

impl Screen {
    /// Activate `route`. Chat starts a fresh session and returns its greeting dispatch;
    /// Results without a handoff redirects to Landing.
    pub fn activate(route: Route, handoff: Option<Handoff>) -> (Screen, Option<Dispatch>) {
        match (route, handoff) {
            (Route::Landing, _) => (Screen::Landing, None),
            (Route::Chat, _) => {
                let (driver, dispatch) = ConversationDriver::bootstrap();
                (Screen::Chat(driver), Some(dispatch))
            }
            (Route::Results, Some(handoff)) => (Screen::Results(handoff.profile), None),
            (Route::Results, None) => {
                log::debug!("results opened without a profile; redirecting to landing");
                (Screen::Landing, None)
            }
        }
    }

    pub fn route(&self) -> Route {
        match self {
            Screen::Landing => Route::Landing,
            Screen::Chat(_) => Route::Chat,
            Screen::Results(_) => Route::Results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fallback;

    #[test]
    fn paths_round_trip() {
        for route in [Route::Landing, Route::Chat, Route::Results] {
            assert_eq!(Route::from_path(route.path()), route);
        }
        assert_eq!(Route::from_path("/results/"), Route::Results);
        assert_eq!(Route::from_path("/nowhere"), Route::Landing);
    }

    #[test]
    fn results_without_profile_redirects_to_landing() {
        let (screen, dispatch) = Screen::activate(Route::Results, None);
        assert_eq!(screen.route(), Route::Landing);
        assert!(dispatch.is_none());
    }

    #[test]
    fn results_with_handoff_shows_profile() {
        let handoff = Handoff {
            profile: fallback::demo_profile(),
        };
        let (screen, _) = Screen::activate(Route::Results, Some(handoff));
        match screen {
            Screen::Results(p) => assert_eq!(p.type_code, "entp"),
            other => panic!("expected results, got {:?}", other.route()),
        }
    }

    #[test]
    fn chat_activation_bootstraps_session() {
        let (screen, dispatch) = Screen::activate(Route::Chat, None);
        let dispatch = dispatch.expect("greeting dispatch");
        match screen {
            Screen::Chat(driver) => {
                assert!(driver.is_awaiting());
                assert_eq!(&dispatch.session_id, driver.session_id());
            }
            other => panic!("expected chat, got {:?}", other.route()),
        }
    }

    #[test]
    fn each_chat_activation_gets_a_new_session() {
        let (_, a) = Screen::activate(Route::Chat, None);
        let (_, b) = Screen::activate(Route::Chat, None);
        assert_ne!(a.unwrap().session_id, b.unwrap().session_id);
    }
}
