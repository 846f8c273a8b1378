// Channel Subscription Manager: keeps at most one live subscription per topic on top of a single
// persistent connection.
//
// Operations never fail. When the connection is not active, subscribe and send are dropped with a
// warning; nothing is queued. Reconnecting does not restore subscriptions: the owner must
// subscribe again once the transport reports that it is connected.

use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;


pub type SubscriptionId = u64;

// A message broker connection as seen by the client core. Implemented by the WebSocket transport
// in the console and by in-memory fakes in tests.
pub trait Transport {
    fn connect(&mut self);
    fn disconnect(&mut self);
    fn is_active(&self) -> bool;
    fn subscribe(&mut self, topic: &str) -> SubscriptionId;
    fn unsubscribe(&mut self, subscription: SubscriptionId);
    fn send(&mut self, destination: &str, body: String);
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct InboundFrame {
    pub subscription: SubscriptionId,
    pub topic: String,
    pub body: String,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Frame(InboundFrame),
}

#[derive(Debug)]
struct Registration<H> {
    subscription: SubscriptionId,
    handler: H,
}

#[derive(Debug)]
pub struct SubscriptionManager<T, H> {
    transport: T,
    registry: HashMap<String, Registration<H>>,
}

impl<T: Transport, H> SubscriptionManager<T, H> {
    pub fn new(transport: T) -> Self { SubscriptionManager { transport, registry: HashMap::new() } }

    pub fn transport(&self) -> &T { &self.transport }
    pub fn transport_mut(&mut self) -> &mut T { &mut self.transport }
    pub fn is_active(&self) -> bool { self.transport.is_active() }

    pub fn connect(&mut self) {
        if !self.transport.is_active() {
            self.transport.connect();
        }
    }

    pub fn is_subscribed(&self, topic: &str) -> bool { self.registry.contains_key(topic) }
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str).sorted()
    }

    // Returns whether the subscription was installed.
    pub fn subscribe(&mut self, topic: &str, handler: H) -> bool {
        if !self.transport.is_active() {
            log::warn!("Cannot subscribe to {topic}: not connected");
            return false;
        }
        if let Some(old) = self.registry.remove(topic) {
            log::info!("Resubscribing to {topic}");
            self.transport.unsubscribe(old.subscription);
        } else {
            log::info!("Subscribing to {topic}");
        }
        let subscription = self.transport.subscribe(topic);
        self.registry.insert(topic.to_owned(), Registration { subscription, handler });
        true
    }

    pub fn unsubscribe(&mut self, topic: &str) {
        if let Some(registration) = self.registry.remove(topic) {
            log::info!("Unsubscribing from {topic}");
            if self.transport.is_active() {
                self.transport.unsubscribe(registration.subscription);
            }
        }
    }

    // Fire-and-forget. Returns whether the message was handed to the transport.
    pub fn send<B: Serialize + ?Sized>(&mut self, destination: &str, body: &B) -> bool {
        match serde_json::to_string(body) {
            Ok(body) => self.send_raw(destination, body),
            Err(err) => {
                log::error!("Cannot serialize message to {destination}: {err}");
                false
            }
        }
    }

    pub fn send_raw(&mut self, destination: &str, body: String) -> bool {
        if !self.transport.is_active() {
            log::warn!("Cannot send to {destination}: not connected");
            return false;
        }
        self.transport.send(destination, body);
        true
    }

    // Releases every subscription, clears the registry and closes the connection.
    pub fn disconnect(&mut self) {
        if self.transport.is_active() {
            for (topic, registration) in self.registry.drain() {
                log::debug!("Releasing subscription to {topic}");
                self.transport.unsubscribe(registration.subscription);
            }
            self.transport.disconnect();
        }
        self.registry.clear();
    }

    // The connection went away on its own. Handles died with it; only the registry is cleared.
    pub fn connection_lost(&mut self) {
        if !self.registry.is_empty() {
            log::info!("Connection lost, dropping {} subscriptions", self.registry.len());
        }
        self.registry.clear();
    }

    // Finds the handler for an inbound frame. Frames that belong to a released subscription (e.g.
    // delivered just before a resubscribe) are dropped.
    pub fn handler_for(&mut self, frame: &InboundFrame) -> Option<&mut H> {
        match self.registry.get_mut(&frame.topic) {
            Some(registration) if registration.subscription == frame.subscription => {
                Some(&mut registration.handler)
            }
            Some(_) => {
                log::debug!("Dropping frame from a released subscription to {}", frame.topic);
                None
            }
            None => {
                log::debug!("Dropping frame for unknown topic {}", frame.topic);
                None
            }
        }
    }
}

impl<T: Transport, F: FnMut(&str)> SubscriptionManager<T, F> {
    // Invokes the registered callback with the frame body. Returns whether it was delivered.
    pub fn deliver(&mut self, frame: &InboundFrame) -> bool {
        match self.handler_for(frame) {
            Some(handler) => {
                handler(&frame.body);
                true
            }
            None => false,
        }
    }
}


#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::test_util::{RecordingTransport, SentMessage};

    type Callback = Box<dyn FnMut(&str)>;

    fn counter() -> (Rc<Cell<u32>>, Callback) {
        let count = Rc::new(Cell::new(0));
        let handler_count = Rc::clone(&count);
        (count, Box::new(move |_: &str| handler_count.set(handler_count.get() + 1)))
    }

    fn connected_manager() -> SubscriptionManager<RecordingTransport, Callback> {
        let mut manager = SubscriptionManager::new(RecordingTransport::new());
        manager.connect();
        manager
    }

    #[test]
    fn resubscribe_delivers_once() {
        let mut manager = connected_manager();
        let (first, first_handler) = counter();
        let (second, second_handler) = counter();
        assert!(manager.subscribe("/topic/a", first_handler));
        let stale = manager.transport().frame("/topic/a", "{}").unwrap();
        assert!(manager.subscribe("/topic/a", second_handler));
        let fresh = manager.transport().frame("/topic/a", "{}").unwrap();

        assert!(!manager.deliver(&stale));
        assert!(manager.deliver(&fresh));
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
        assert_eq!(manager.transport().active_subscriptions(), vec!["/topic/a".to_owned()]);
    }

    #[test]
    fn unsubscribe_absent_is_noop() {
        let mut manager = connected_manager();
        manager.unsubscribe("/topic/none");
        let (_, handler) = counter();
        manager.subscribe("/topic/a", handler);
        manager.unsubscribe("/topic/a");
        manager.unsubscribe("/topic/a");
        assert!(!manager.is_subscribed("/topic/a"));
        assert!(manager.transport().active_subscriptions().is_empty());
    }

    #[test]
    fn inactive_connection_drops_operations() {
        let mut manager: SubscriptionManager<_, Callback> =
            SubscriptionManager::new(RecordingTransport::new());
        let (_, handler) = counter();
        assert!(!manager.subscribe("/topic/a", handler));
        assert!(!manager.send("/app/x", &serde_json::json!({"a": 1})));
        assert!(!manager.is_subscribed("/topic/a"));
        assert!(manager.transport().sent().is_empty());
    }

    #[test]
    fn send_serializes_body() {
        let mut manager = connected_manager();
        assert!(manager.send("/app/x", &serde_json::json!({"a": 1})));
        assert_eq!(manager.transport().sent(), &[SentMessage {
            destination: "/app/x".to_owned(),
            body: r#"{"a":1}"#.to_owned(),
        }]);
    }

    #[test]
    fn disconnect_clears_registry_without_restore() {
        let mut manager = connected_manager();
        let (_, a) = counter();
        let (_, b) = counter();
        manager.subscribe("/topic/a", a);
        manager.subscribe("/topic/b", b);
        assert_eq!(manager.topics().collect_vec(), vec!["/topic/a", "/topic/b"]);
        manager.disconnect();
        assert!(!manager.is_active());
        assert_eq!(manager.topics().count(), 0);
        assert!(manager.transport().active_subscriptions().is_empty());

        manager.connect();
        assert_eq!(manager.topics().count(), 0);
        assert!(manager.transport().active_subscriptions().is_empty());
    }

    #[test]
    fn connection_lost_clears_registry() {
        let mut manager = connected_manager();
        let (_, a) = counter();
        manager.subscribe("/topic/a", a);
        manager.transport_mut().drop_connection();
        manager.connection_lost();
        assert_eq!(manager.topics().count(), 0);
    }
}
