//! Change notification bus for the code-block graph.
//!
//! Subscribers pick events by NATS-style subject pattern:
//! - `*` matches exactly one token: `code.*` matches `code.dsl_changed`
//! - `>` matches one or more tokens (only at end): `code.>`
//! - anything else must match exactly
//!
//! Dropping a [`Subscription`] unsubscribes.
//!
//! # Example
//!
//! ```ignore
//! let bus = FlowBus::<CodeFlow>::new(1024);
//! let mut sub = bus.subscribe("code.dsl_changed");
//!
//! bus.publish(CodeFlow::DslChanged { dsl });
//!
//! while let Some(msg) = sub.recv().await {
//!     println!("{} blocks", msg.payload.dsl().map_or(0, |d| d.len()));
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast;

use codeblock_types::{CodeBlockDsl, CodeRelation};

/// Check if a subject matches a pattern.
///
/// ```ignore
/// assert!(matches_pattern("code.*", "code.dsl_changed"));
/// assert!(matches_pattern("code.>", "code.dsl_changed"));
/// assert!(!matches_pattern("code.*", "code.dsl.changed"));
/// ```
pub fn matches_pattern(pattern: &str, subject: &str) -> bool {
    let pattern_tokens: Vec<&str> = pattern.split('.').collect();
    let subject_tokens: Vec<&str> = subject.split('.').collect();

    let mut pi = 0;
    let mut si = 0;

    while pi < pattern_tokens.len() && si < subject_tokens.len() {
        match pattern_tokens[pi] {
            ">" => {
                // `>` must be last and swallows the rest
                return pi == pattern_tokens.len() - 1;
            }
            "*" => {
                pi += 1;
                si += 1;
            }
            token => {
                if token != subject_tokens[si] {
                    return false;
                }
                pi += 1;
                si += 1;
            }
        }
    }

    pi == pattern_tokens.len() && si == subject_tokens.len()
}

/// Payloads that know their subject.
pub trait HasSubject {
    fn subject(&self) -> &str;
}

/// A message published on the bus; the subject is resolved once at publish.
#[derive(Clone, Debug)]
pub struct FlowMessage<T> {
    pub subject: String,
    pub payload: T,
}

impl<T: HasSubject> FlowMessage<T> {
    pub fn new(payload: T) -> Self {
        Self {
            subject: payload.subject().to_string(),
            payload,
        }
    }
}

/// Events emitted by the code-block graph.
#[derive(Clone, Debug)]
pub enum CodeFlow {
    /// The forward mapping was replaced. Always carries the whole new
    /// mapping, never a diff.
    DslChanged { dsl: Arc<CodeBlockDsl> },
    /// The relation cache was rebuilt.
    RelationsRefreshed { relations: Arc<CodeRelation> },
}

impl CodeFlow {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::DslChanged { .. } => "code.dsl_changed",
            Self::RelationsRefreshed { .. } => "code.relations_refreshed",
        }
    }

    pub fn dsl(&self) -> Option<&Arc<CodeBlockDsl>> {
        match self {
            Self::DslChanged { dsl } => Some(dsl),
            Self::RelationsRefreshed { .. } => None,
        }
    }
}

impl HasSubject for CodeFlow {
    fn subject(&self) -> &str {
        CodeFlow::subject(self)
    }
}

/// Typed broadcast bus with pattern-filtered subscriptions.
#[derive(Debug)]
pub struct FlowBus<T: Clone + Send + 'static> {
    tx: broadcast::Sender<FlowMessage<T>>,
}

impl<T: Clone + Send + 'static> FlowBus<T> {
    /// `capacity` must be non-zero; [`GraphConfig`](crate::GraphConfig)
    /// validation guarantees it for the service's bus.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Send + HasSubject + 'static> FlowBus<T> {
    /// Publish a payload. Returns how many subscribers received it; zero
    /// subscribers is not an error.
    pub fn publish(&self, payload: T) -> usize {
        self.tx.send(FlowMessage::new(payload)).unwrap_or(0)
    }

    pub fn subscribe(&self, pattern: &str) -> Subscription<T> {
        Subscription {
            pattern: pattern.to_string(),
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone + Send + 'static> Clone for FlowBus<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Pattern-filtered receiver. Dropping it unsubscribes.
pub struct Subscription<T: Clone> {
    pattern: String,
    rx: broadcast::Receiver<FlowMessage<T>>,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next matching message. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<FlowMessage<T>> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => {
                    if matches_pattern(&self.pattern, &msg.subject) {
                        return Some(msg);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        pattern = %self.pattern,
                        lagged = n,
                        "Flow subscription lagged behind"
                    );
                }
            }
        }
    }

    /// Next matching message if one is already queued.
    pub fn try_recv(&mut self) -> Option<FlowMessage<T>> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    if matches_pattern(&self.pattern, &msg.subject) {
                        return Some(msg);
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(
                        pattern = %self.pattern,
                        lagged = n,
                        "Flow subscription lagged behind"
                    );
                }
            }
        }
    }
}

impl<T: Clone> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

pub type SharedCodeFlowBus = Arc<FlowBus<CodeFlow>>;

pub fn shared_code_flow_bus(capacity: usize) -> SharedCodeFlowBus {
    Arc::new(FlowBus::new(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeblock_types::CodeBlockContent;

    fn changed(ids: &[&str]) -> CodeFlow {
        let dsl: CodeBlockDsl = ids
            .iter()
            .map(|id| (id.to_string(), CodeBlockContent::default()))
            .collect();
        CodeFlow::DslChanged { dsl: Arc::new(dsl) }
    }

    #[test]
    fn test_pattern_matching_exact() {
        assert!(matches_pattern("code.dsl_changed", "code.dsl_changed"));
        assert!(!matches_pattern("code.dsl_changed", "code.relations_refreshed"));
        assert!(!matches_pattern("code.dsl_changed", "code.dsl_changed.extra"));
    }

    #[test]
    fn test_pattern_matching_wildcards() {
        assert!(matches_pattern("code.*", "code.dsl_changed"));
        assert!(!matches_pattern("code.*", "code.dsl.changed"));
        assert!(matches_pattern("code.>", "code.dsl.changed"));
        assert!(!matches_pattern("code.>", "code"));
        assert!(matches_pattern("*.dsl_changed", "code.dsl_changed"));
        assert!(!matches_pattern("page.*", "code.dsl_changed"));
    }

    #[test]
    fn test_flow_subjects() {
        assert_eq!(changed(&[]).subject(), "code.dsl_changed");
        let refreshed = CodeFlow::RelationsRefreshed {
            relations: Arc::new(CodeRelation::new()),
        };
        assert_eq!(refreshed.subject(), "code.relations_refreshed");
        assert!(refreshed.dsl().is_none());
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus: FlowBus<CodeFlow> = FlowBus::new(16);
        let mut sub = bus.subscribe("code.*");

        let bus_clone = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            bus_clone.publish(changed(&["code_1"]));
        });

        let msg = tokio::time::timeout(std::time::Duration::from_millis(500), sub.recv())
            .await
            .expect("timeout")
            .expect("no message");

        assert_eq!(msg.subject, "code.dsl_changed");
        assert!(msg.payload.dsl().unwrap().contains_key("code_1"));
    }

    #[test]
    fn test_subscription_pattern_filtering() {
        let bus: FlowBus<CodeFlow> = FlowBus::new(16);
        let mut dsl_sub = bus.subscribe("code.dsl_changed");
        let mut rel_sub = bus.subscribe("code.relations_refreshed");

        bus.publish(changed(&["a"]));
        bus.publish(CodeFlow::RelationsRefreshed {
            relations: Arc::new(CodeRelation::new()),
        });

        assert_eq!(dsl_sub.try_recv().unwrap().subject, "code.dsl_changed");
        assert!(dsl_sub.try_recv().is_none());
        assert_eq!(rel_sub.try_recv().unwrap().subject, "code.relations_refreshed");
        assert!(rel_sub.try_recv().is_none());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = shared_code_flow_bus(8);
        let sub = bus.subscribe("code.*");
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(changed(&[])), 0);
    }

    #[test]
    fn test_message_carries_resolved_subject() {
        let msg = FlowMessage::new(changed(&["a"]));
        assert_eq!(msg.subject, "code.dsl_changed");
        assert_eq!(msg.payload.dsl().unwrap().len(), 1);
    }
}
