// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// A generic, thread-safe event channel.
///
/// The bus is generic over the event type `T`, so `strata-core` stays
/// decoupled from the event vocabularies of higher-level crates. Windows use
/// it to hand surface events to the frame loop.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Creates a new bus backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::trace!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Sends an event, logging an error if the receiver is disconnected.
    ///
    /// ## Arguments
    /// * `event` - The event to be sent over the channel.
    pub fn publish(&self, event: T) {
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Returns a clone of the sender end of the channel.
    ///
    /// ## Returns
    /// A sender other parts of the system can publish through.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Takes every event currently queued, in publication order, without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};

    #[derive(Debug, Clone, PartialEq)]
    enum SurfaceEvent {
        Resized { width: u32, height: u32 },
        Hidden,
        Shown,
    }

    #[test]
    fn new_bus_is_empty() {
        let bus = EventBus::<SurfaceEvent>::new();
        assert!(bus.receiver().is_empty());
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn drain_preserves_publication_order() {
        let bus = EventBus::new();
        bus.publish(SurfaceEvent::Hidden);
        bus.publish(SurfaceEvent::Shown);
        bus.publish(SurfaceEvent::Resized {
            width: 4,
            height: 2,
        });

        assert_eq!(
            bus.drain(),
            vec![
                SurfaceEvent::Hidden,
                SurfaceEvent::Shown,
                SurfaceEvent::Resized {
                    width: 4,
                    height: 2
                },
            ]
        );
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn events_cross_threads() {
        let bus = EventBus::new();
        let sender = bus.sender();
        let producer = thread::spawn(move || {
            for _ in 0..8 {
                sender.send(SurfaceEvent::Hidden).expect("receiver alive");
            }
        });
        producer.join().expect("producer thread panicked");

        let mut received = 0;
        while bus
            .receiver()
            .recv_timeout(Duration::from_millis(50))
            .is_ok()
        {
            received += 1;
        }
        assert_eq!(received, 8);
    }
}
