//! Explicit event queues. Each module owns one and the scene drains it after the module ticks.

use std::collections::VecDeque;

/// FIFO of notifications produced by one module during a tick.
#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    events: VecDeque<E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: E) {
        self.events.push_back(event);
    }

    /// Take every pending event in emission order.
    pub fn drain(&mut self) -> impl Iterator<Item = E> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order_and_empties() {
        let mut q = EventQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        let got: Vec<_> = q.drain().collect();
        assert_eq!(got, vec![1, 2, 3]);
        assert!(q.is_empty());
    }
}
