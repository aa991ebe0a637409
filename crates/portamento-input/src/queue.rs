//! Bounded SPSC message queue.
//!
//! - Producer: backend driver thread
//! - Consumer: application thread polling for messages
//!
//! Overflow drops the incoming message and keeps what is already buffered,
//! so the producer never waits on a slow consumer.

use crate::error::{Error, Result};
use crate::message::MidiMessage;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

/// Producer side -- push messages from the driver thread.
pub struct QueueProducer {
    producer: HeapProd<MidiMessage>,
}

impl QueueProducer {
    /// Returns `false` if the queue is full; the message is dropped.
    #[inline]
    pub fn push(&mut self, message: MidiMessage) -> bool {
        self.producer.try_push(message).is_ok()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.producer.capacity().get()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.producer.is_full()
    }
}

/// Consumer side -- drain messages on the application thread.
pub struct QueueConsumer {
    consumer: HeapCons<MidiMessage>,
}

impl QueueConsumer {
    #[inline]
    pub fn try_pop(&mut self) -> Option<MidiMessage> {
        self.consumer.try_pop()
    }

    /// Oldest queued message, or the empty record when nothing is queued.
    #[inline]
    pub fn pop(&mut self) -> MidiMessage {
        self.try_pop().unwrap_or_default()
    }

    pub fn drain_all(&mut self) -> Vec<MidiMessage> {
        let mut messages = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(message) = self.consumer.try_pop() {
            messages.push(message);
        }
        messages
    }

    #[inline]
    pub fn occupied(&self) -> usize {
        self.consumer.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.consumer.capacity().get()
    }
}

/// Allocates a queue holding at most `capacity` messages.
pub fn message_queue(capacity: usize) -> Result<(QueueProducer, QueueConsumer)> {
    if capacity == 0 {
        return Err(Error::InvalidParameter(
            "queue size limit must be at least 1".to_string(),
        ));
    }
    let rb = HeapRb::new(capacity);
    let (producer, consumer) = rb.split();
    Ok((QueueProducer { producer }, QueueConsumer { consumer }))
}

impl std::fmt::Debug for QueueProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueProducer")
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl std::fmt::Debug for QueueConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConsumer")
            .field("capacity", &self.capacity())
            .field("occupied", &self.occupied())
            .finish()
    }
}
