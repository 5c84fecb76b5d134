//! Coordination of list requests: search debouncing and stale response
//! suppression.
//!
//! Nothing here touches a clock or a runtime. Callers pass `Instant`s in,
//! which keeps the timing rules testable.
//!
//! The server-rendered list page debounces in the browser with the same
//! [`SEARCH_DEBOUNCE`] and issues one query per request, so it needs no
//! tickets. `vip-cli users list` runs its query through
//! [`UserListController`]; interactive clients use it to debounce and to
//! drop stale responses.

use std::time::{Duration, Instant};

use crate::query::{UserListState, UserQuery};

/// Quiet period before typed search text is applied.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Buffers search input until it has been stable for the quiet period.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    quiet: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl SearchDebouncer {
    #[must_use]
    pub const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Record a keystroke; restarts the quiet period.
    pub fn input(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some((text.into(), now));
    }

    /// The buffered text once it has been stable for the quiet period.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= self.quiet);
        if ready {
            self.pending.take().map(|(text, _)| text)
        } else {
            None
        }
    }

    /// When the buffered text becomes ready, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.quiet)
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

/// Monotonic request counter. Only the latest ticket is current.
#[derive(Debug, Clone, Default)]
pub struct RequestGeneration {
    latest: u64,
}

impl RequestGeneration {
    /// Issue a ticket for a new request, superseding all earlier ones.
    pub const fn issue(&mut self) -> RequestTicket {
        self.latest += 1;
        RequestTicket(self.latest)
    }

    /// Whether a response for `ticket` may still be applied.
    #[must_use]
    pub const fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }
}

/// A query ready to be sent, with the ticket its response must present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub ticket: RequestTicket,
    pub query: UserQuery,
}

/// Drives the user list: owns its state, debounces search input and
/// discards responses that arrive after a newer query was issued.
#[derive(Debug, Clone)]
pub struct UserListController<T> {
    container: String,
    state: UserListState,
    debouncer: SearchDebouncer,
    generation: RequestGeneration,
    current: Option<T>,
}

impl<T> UserListController<T> {
    #[must_use]
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            state: UserListState::new(),
            debouncer: SearchDebouncer::default(),
            generation: RequestGeneration::default(),
            current: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &UserListState {
        &self.state
    }

    /// The last applied response.
    #[must_use]
    pub const fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Buffer typed search text. No query is issued until it settles.
    pub fn type_search(&mut self, text: impl Into<String>, now: Instant) {
        self.debouncer.input(text, now);
    }

    /// Apply settled search text. Returns a query when the state changed.
    pub fn tick(&mut self, now: Instant) -> Option<PendingQuery> {
        let text = self.debouncer.poll(now)?;
        self.state.set_search(text).then(|| self.issue())
    }

    /// Change the state through `update` and issue a query if it changed.
    pub fn update(
        &mut self,
        update: impl FnOnce(&mut UserListState) -> bool,
    ) -> Option<PendingQuery> {
        update(&mut self.state).then(|| self.issue())
    }

    /// Issue a query for the current state regardless of changes.
    pub fn refresh(&mut self) -> PendingQuery {
        self.issue()
    }

    /// Apply a response. Returns `false` and drops it when stale.
    pub fn receive(&mut self, ticket: RequestTicket, response: T) -> bool {
        if !self.generation.is_current(ticket) {
            tracing::debug!(?ticket, "dropping stale list response");
            return false;
        }
        self.current = Some(response);
        true
    }

    fn issue(&mut self) -> PendingQuery {
        PendingQuery {
            ticket: self.generation.issue(),
            query: self.state.to_query(&self.container),
        }
    }
}
