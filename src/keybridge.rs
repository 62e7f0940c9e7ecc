//! Escape-key bridge.
//!
//! The editor captures Escape for itself. The bridge binds Escape inside the
//! editor (only while the suggestion overlay is closed) and republishes it
//! on a channel the surrounding application subscribes to.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::WidgetError;
use crate::widget::{EditorWidget, KeyCode, SUGGEST_WIDGET_VISIBLE};

/// A key the editor swallowed and handed back to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgedKey {
    pub key: String,
    /// Id of the editor container the key was pressed in.
    pub target: String,
}

/// Fan-out channel for bridged keys.
#[derive(Debug, Clone, Default)]
pub struct KeyBridge {
    subscribers: Rc<RefCell<Vec<UnboundedSender<BridgedKey>>>>,
}

impl KeyBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<BridgedKey> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.borrow_mut().push(tx);
        rx
    }

    /// Deliver `key` to every live subscriber; returns how many received it.
    pub fn publish(&self, key: &BridgedKey) -> usize {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|tx| tx.send(key.clone()).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

/// Bind Escape in `widget` so it reaches `bridge` subscribers.
///
/// # Errors
/// Propagates the widget's refusal to register the command.
pub fn install_escape_bridge(
    widget: &dyn EditorWidget,
    bridge: &KeyBridge,
    container: &str,
) -> Result<(), WidgetError> {
    let when = format!("!{SUGGEST_WIDGET_VISIBLE}");
    let bridge = bridge.clone();
    let target = container.to_string();
    widget.add_command(
        KeyCode::Escape,
        Some(&when),
        Box::new(move || {
            let delivered = bridge.publish(&BridgedKey {
                key: "Escape".to_string(),
                target: target.clone(),
            });
            tracing::debug!(container = %target, delivered, "escape bridged to page");
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escape() -> BridgedKey {
        BridgedKey {
            key: "Escape".to_string(),
            target: "editor".to_string(),
        }
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let bridge = KeyBridge::new();
        let mut a = bridge.subscribe();
        let mut b = bridge.subscribe();
        assert_eq!(bridge.publish(&escape()), 2);
        assert_eq!(a.try_recv().unwrap(), escape());
        assert_eq!(b.try_recv().unwrap(), escape());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bridge = KeyBridge::new();
        let keep = bridge.subscribe();
        drop(bridge.subscribe());
        assert_eq!(bridge.subscriber_count(), 1);
        assert_eq!(bridge.publish(&escape()), 1);
        drop(keep);
        assert_eq!(bridge.publish(&escape()), 0);
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        assert_eq!(KeyBridge::new().publish(&escape()), 0);
    }
}
