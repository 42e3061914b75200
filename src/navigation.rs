//! Screen navigation state machine.
//!
//! Exactly one screen is active at a time. Requests naming an unknown screen
//! are coerced to the search screen rather than rejected, so a stale or
//! corrupted request can never leave the UI undefined.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::storage::{keys, Storage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    NameInput,
    SetupComplete,
    Search,
    IndexingLogs,
    Profile,
    Settings,
    Acknowledgement,
}

impl Screen {
    pub const fn name(self) -> &'static str {
        match self {
            Screen::Welcome => "WELCOME",
            Screen::NameInput => "NAME_INPUT",
            Screen::SetupComplete => "SETUP_COMPLETE",
            Screen::Search => "SEARCH",
            Screen::IndexingLogs => "INDEXING_LOGS",
            Screen::Profile => "PROFILE",
            Screen::Settings => "SETTINGS",
            Screen::Acknowledgement => "ACKNOWLEDGEMENT",
        }
    }

    pub fn from_name(name: &str) -> Option<Screen> {
        match name {
            "WELCOME" => Some(Screen::Welcome),
            "NAME_INPUT" => Some(Screen::NameInput),
            "SETUP_COMPLETE" => Some(Screen::SetupComplete),
            "SEARCH" => Some(Screen::Search),
            "INDEXING_LOGS" => Some(Screen::IndexingLogs),
            "PROFILE" => Some(Screen::Profile),
            "SETTINGS" => Some(Screen::Settings),
            "ACKNOWLEDGEMENT" => Some(Screen::Acknowledgement),
            _ => None,
        }
    }

    /// Transient screens advance on their own after a fixed delay.
    pub const fn auto_advance(self) -> Option<(Screen, Duration)> {
        match self {
            Screen::Welcome => Some((Screen::NameInput, Duration::from_secs(2))),
            Screen::SetupComplete => Some((Screen::Search, Duration::from_secs(3))),
            _ => None,
        }
    }
}

/// Whether the search screen can actually search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchGate {
    Ready,
    /// No monitored roots exist; the UI shows a "no folders configured"
    /// state directing the user to settings instead of a search box.
    NoRoots,
}

pub fn search_gate(roots: &[String]) -> SearchGate {
    if roots.is_empty() {
        SearchGate::NoRoots
    } else {
        SearchGate::Ready
    }
}

fn flag_set(storage: &dyn Storage, key: &str) -> bool {
    storage.get(key).as_deref() == Some("true")
}

/// Derives the startup screen from the durable onboarding flags.
pub fn initial_screen(storage: &dyn Storage) -> Screen {
    if flag_set(storage, keys::ONBOARDING_COMPLETE) {
        Screen::Search
    } else if flag_set(storage, keys::HELLO_SEEN) {
        Screen::NameInput
    } else {
        Screen::Welcome
    }
}

pub struct Nav {
    storage: Arc<dyn Storage>,
    screen: Screen,
}

impl Nav {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let screen = initial_screen(storage.as_ref());
        let nav = Self { storage, screen };
        // The welcome screen shows at most once, so it is marked seen the
        // moment it becomes active, not when it is left.
        if nav.screen == Screen::Welcome {
            nav.storage.set(keys::HELLO_SEEN, "true");
        }
        nav
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn goto(&mut self, screen: Screen) {
        debug!("navigate: {} -> {}", self.screen.name(), screen.name());
        self.screen = screen;
    }

    /// Navigation by untrusted name. Unknown targets coerce to the search
    /// screen; this never fails.
    pub fn request(&mut self, name: &str) {
        match Screen::from_name(name) {
            Some(screen) => self.goto(screen),
            None => {
                warn!("invalid screen requested: {:?}, falling back to SEARCH", name);
                self.goto(Screen::Search);
            }
        }
    }

    /// Waits out the active screen's auto-advance delay, then transitions.
    /// No-op for non-transient screens. Dropping the returned future cancels
    /// the pending transition, which is how a torn-down view aborts its
    /// timer.
    pub async fn run_transient(&mut self) {
        let Some((next, delay)) = self.screen.auto_advance() else {
            return;
        };
        tokio::time::sleep(delay).await;
        if self.screen == Screen::SetupComplete {
            // Leaving setup-complete is the durable end of onboarding.
            self.storage.set(keys::ONBOARDING_COMPLETE, "true");
        }
        self.goto(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn storage() -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn first_launch_starts_at_welcome_and_marks_hello_seen() {
        let storage = storage();
        let nav = Nav::new(storage.clone());
        assert_eq!(nav.screen(), Screen::Welcome);
        assert_eq!(storage.get(keys::HELLO_SEEN).as_deref(), Some("true"));
    }

    #[test]
    fn second_launch_skips_welcome() {
        let storage = storage();
        storage.set(keys::HELLO_SEEN, "true");
        let nav = Nav::new(storage);
        assert_eq!(nav.screen(), Screen::NameInput);
    }

    #[test]
    fn onboarded_launch_starts_at_search() {
        let storage = storage();
        storage.set(keys::ONBOARDING_COMPLETE, "true");
        let nav = Nav::new(storage);
        assert_eq!(nav.screen(), Screen::Search);
    }

    #[test]
    fn unknown_request_coerces_to_search() {
        let storage = storage();
        storage.set(keys::ONBOARDING_COMPLETE, "true");
        let mut nav = Nav::new(storage);

        nav.request("SETTINGS");
        assert_eq!(nav.screen(), Screen::Settings);

        nav.request("DASHBOARD");
        assert_eq!(nav.screen(), Screen::Search);

        nav.request("");
        assert_eq!(nav.screen(), Screen::Search);
    }

    #[test]
    fn screen_names_roundtrip() {
        for screen in [
            Screen::Welcome,
            Screen::NameInput,
            Screen::SetupComplete,
            Screen::Search,
            Screen::IndexingLogs,
            Screen::Profile,
            Screen::Settings,
            Screen::Acknowledgement,
        ] {
            assert_eq!(Screen::from_name(screen.name()), Some(screen));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn welcome_auto_advances_after_two_seconds() {
        let mut nav = Nav::new(storage());
        assert_eq!(nav.screen(), Screen::Welcome);

        let start = tokio::time::Instant::now();
        nav.run_transient().await;
        assert_eq!(nav.screen(), Screen::NameInput);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn setup_complete_advances_and_marks_onboarding() {
        let storage = storage();
        let mut nav = Nav::new(storage.clone());
        nav.goto(Screen::SetupComplete);

        nav.run_transient().await;
        assert_eq!(nav.screen(), Screen::Search);
        assert_eq!(
            storage.get(keys::ONBOARDING_COMPLETE).as_deref(),
            Some("true")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_transient_future_cancels_the_timer() {
        let storage = storage();
        let mut nav = Nav::new(storage.clone());

        {
            let pending = nav.run_transient();
            tokio::pin!(pending);
            let poked = tokio::time::timeout(Duration::from_millis(500), &mut pending).await;
            assert!(poked.is_err(), "transition should still be pending");
            // `pending` dropped here: timer cancelled.
        }

        assert_eq!(nav.screen(), Screen::Welcome);
        assert_eq!(storage.get(keys::ONBOARDING_COMPLETE), None);
    }

    #[tokio::test]
    async fn run_transient_is_a_noop_on_stable_screens() {
        let storage = storage();
        storage.set(keys::ONBOARDING_COMPLETE, "true");
        let mut nav = Nav::new(storage);

        nav.run_transient().await; // returns immediately
        assert_eq!(nav.screen(), Screen::Search);
    }

    #[test]
    fn gate_requires_at_least_one_root() {
        assert_eq!(search_gate(&[]), SearchGate::NoRoots);
        assert_eq!(search_gate(&["/docs".to_string()]), SearchGate::Ready);
    }
}
