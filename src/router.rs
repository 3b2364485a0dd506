//! Protocol message router.
//!
//! Maps address patterns to handlers and dispatches inbound messages
//! fire-and-forget: every resolved handler runs in its own spawned task,
//! so the router never blocks on handler work. A trailing `*` in a
//! pattern matches any remaining path segment; the most specific
//! (longest-prefix) registration wins.
//!
//! The panel-control gate sits in front of everything: while closed,
//! only the gate-toggle address is processed and all other traffic is
//! silently dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::error::ProtocolError;
use crate::osc::OscMessage;
use crate::state::CoordinatorState;

/// Boxed handler future.
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A registered message handler.
pub type Handler = Arc<dyn Fn(OscMessage) -> HandlerFuture + Send + Sync>;

/// Wraps an async closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(OscMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |msg| Box::pin(f(msg)))
}

/// Route origin, deciding which registrations an atomic custom-mapping
/// swap may replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Built-in panel-control route; never touched by mapping updates.
    Panel,
    /// Data-driven user mapping; replaced wholesale on update.
    Custom,
}

/// An address pattern, optionally ending in a wildcard segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    prefix: Vec<String>,
    wildcard: bool,
}

impl RoutePattern {
    /// Parses a pattern like `/avatar/parameters/SoundPad/Button/*`.
    ///
    /// Only a trailing `*` is a wildcard; embedded asterisks are taken
    /// literally.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let mut prefix: Vec<String> = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let wildcard = prefix.last().is_some_and(|s| s == "*");
        if wildcard {
            prefix.pop();
        }
        Self { prefix, wildcard }
    }

    /// Whether this pattern matches the given address.
    #[must_use]
    pub fn matches(&self, address: &str) -> bool {
        let segments: Vec<&str> = address.split('/').filter(|s| !s.is_empty()).collect();
        if self.wildcard {
            segments.len() > self.prefix.len()
                && segments[..self.prefix.len()]
                    .iter()
                    .zip(&self.prefix)
                    .all(|(a, b)| a == b)
        } else {
            segments.len() == self.prefix.len()
                && segments.iter().zip(&self.prefix).all(|(a, b)| a == b)
        }
    }

    /// Number of literal segments; higher is more specific.
    #[must_use]
    pub fn specificity(&self) -> usize {
        // An exact pattern outranks a wildcard of equal prefix length
        self.prefix.len() * 2 + usize::from(!self.wildcard)
    }
}

struct Route {
    pattern: RoutePattern,
    kind: RouteKind,
    handler: Handler,
}

/// Address-pattern dispatcher with a panel-control gate.
pub struct Router {
    state: Arc<CoordinatorState>,
    gate_address: String,
    routes: RwLock<Vec<Route>>,
}

impl Router {
    /// Creates a router gated on the given master-enable address.
    #[must_use]
    pub fn new(state: Arc<CoordinatorState>, gate_address: impl Into<String>) -> Self {
        Self {
            state,
            gate_address: gate_address.into(),
            routes: RwLock::new(Vec::new()),
        }
    }

    /// Registers a pattern → handler mapping.
    pub fn register(&self, pattern: &str, kind: RouteKind, handler: Handler) {
        self.routes.write().expect("route table lock").push(Route {
            pattern: RoutePattern::parse(pattern),
            kind,
            handler,
        });
    }

    /// Atomically replaces all custom mappings with a new set.
    ///
    /// Panel routes are untouched; no dispatch can observe a half-swapped
    /// table because the write lock covers the whole exchange.
    pub fn replace_custom(&self, entries: Vec<(String, Handler)>) {
        let mut routes = self.routes.write().expect("route table lock");
        routes.retain(|r| r.kind != RouteKind::Custom);
        for (pattern, handler) in entries {
            routes.push(Route {
                pattern: RoutePattern::parse(&pattern),
                kind: RouteKind::Custom,
                handler,
            });
        }
    }

    /// Resolves the most specific matching handler for an address.
    #[must_use]
    pub fn resolve(&self, address: &str) -> Option<Handler> {
        let routes = self.routes.read().expect("route table lock");
        routes
            .iter()
            .filter(|r| r.pattern.matches(address))
            .max_by_key(|r| r.pattern.specificity())
            .map(|r| Arc::clone(&r.handler))
    }

    /// Dispatches a message to its handler, fire-and-forget.
    ///
    /// While the panel-control gate is closed, everything except the
    /// gate-toggle address is dropped without error.
    pub fn dispatch(&self, msg: OscMessage) {
        if !self.state.panel_control() && msg.address != self.gate_address {
            trace!(address = %msg.address, "panel control disabled; message dropped");
            return;
        }

        match self.resolve(&msg.address) {
            Some(h) => {
                tokio::spawn(h(msg));
            }
            None => {
                debug!("{}", ProtocolError::UnknownAddress(msg.address));
            }
        }
    }

    /// Number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.read().expect("route table lock").len()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("gate_address", &self.gate_address)
            .field("routes", &self.route_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osc::OscValue;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_handler() -> (Arc<AtomicU32>, Handler) {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let h = handler(move |_msg| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });
        (count, h)
    }

    #[test]
    fn test_pattern_exact_match() {
        let p = RoutePattern::parse("/avatar/parameters/SoundPad/Page");
        assert!(p.matches("/avatar/parameters/SoundPad/Page"));
        assert!(!p.matches("/avatar/parameters/SoundPad/Page/1"));
        assert!(!p.matches("/avatar/parameters/SoundPad"));
    }

    #[test]
    fn test_pattern_trailing_wildcard() {
        let p = RoutePattern::parse("/avatar/parameters/SoundPad/Button/*");
        assert!(p.matches("/avatar/parameters/SoundPad/Button/1"));
        assert!(p.matches("/avatar/parameters/SoundPad/Button/15"));
        assert!(!p.matches("/avatar/parameters/SoundPad/Button"));
        assert!(!p.matches("/avatar/parameters/SoundPad/Volume"));
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let wildcard = RoutePattern::parse("/a/b/*");
        let exact = RoutePattern::parse("/a/b/c");
        assert!(exact.specificity() > wildcard.specificity());
    }

    #[tokio::test]
    async fn test_longest_match_wins() {
        let state = Arc::new(CoordinatorState::new());
        let router = Router::new(Arc::clone(&state), "/gate");

        let (generic_count, generic) = counting_handler();
        let (specific_count, specific) = counting_handler();
        router.register("/avatar/parameters/*", RouteKind::Custom, generic);
        router.register(
            "/avatar/parameters/SoundPad/Button/*",
            RouteKind::Panel,
            specific,
        );

        router.dispatch(OscMessage::new(
            "/avatar/parameters/SoundPad/Button/4",
            OscValue::Bool(true),
        ));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(specific_count.load(Ordering::SeqCst), 1);
        assert_eq!(generic_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_gate_drops_everything_but_toggle() {
        let state = Arc::new(CoordinatorState::new());
        state.set_panel_control(false);
        let router = Router::new(Arc::clone(&state), "/gate");

        let (gate_count, gate) = counting_handler();
        let (other_count, other) = counting_handler();
        router.register("/gate", RouteKind::Panel, gate);
        router.register("/other", RouteKind::Panel, other);

        router.dispatch(OscMessage::new("/other", OscValue::Bool(true)));
        router.dispatch(OscMessage::new("/gate", OscValue::Bool(true)));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(other_count.load(Ordering::SeqCst), 0);
        assert_eq!(gate_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replace_custom_preserves_panel_routes() {
        let state = Arc::new(CoordinatorState::new());
        let router = Router::new(state, "/gate");

        let (_, panel) = counting_handler();
        let (_, old_custom) = counting_handler();
        router.register("/panel/thing", RouteKind::Panel, panel);
        router.register("/custom/old", RouteKind::Custom, old_custom);
        assert_eq!(router.route_count(), 2);

        let (_, new_a) = counting_handler();
        let (_, new_b) = counting_handler();
        router.replace_custom(vec![
            ("/custom/new_a".to_string(), new_a),
            ("/custom/new_b".to_string(), new_b),
        ]);

        assert_eq!(router.route_count(), 3);
        assert!(router.resolve("/custom/old").is_none());
        assert!(router.resolve("/custom/new_a").is_some());
        assert!(router.resolve("/panel/thing").is_some());
    }
}
