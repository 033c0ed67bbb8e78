//! Broadcast channel for shop events.

use crepe_types::ShopEvent;
use tokio::sync::broadcast;

/// Fan-out bus for [`ShopEvent`]s. Clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<ShopEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per slow subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<ShopEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event and returns how many subscribers received it.
	pub fn publish(&self, event: ShopEvent) -> usize {
		// no subscribers is fine
		self.sender.send(event).unwrap_or(0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_publish_without_subscribers() {
		let bus = EventBus::new(8);
		assert_eq!(bus.publish(ShopEvent::DraftCleared), 0);
	}

	#[tokio::test]
	async fn test_subscribers_receive_events() {
		let bus = EventBus::new(8);
		let mut first = bus.subscribe();
		let mut second = bus.clone().subscribe();

		let event = ShopEvent::OrderRemoved {
			order_id: "order-1".into(),
		};
		assert_eq!(bus.publish(event.clone()), 2);
		assert_eq!(first.recv().await.unwrap(), event);
		assert_eq!(second.recv().await.unwrap(), event);
	}
}
