//! Fixed-capacity trailing windows for streamed data.

use std::collections::vec_deque::{self, VecDeque};

/// Live monitor metric points.
pub const METRICS_WINDOW: usize = 30;
/// Traffic visualizer links.
pub const TRAFFIC_LINK_WINDOW: usize = 50;
/// Traffic visualizer packets.
pub const TRAFFIC_PACKET_WINDOW: usize = 100;
/// Security overview events.
pub const SECURITY_EVENT_WINDOW: usize = 10;
/// Live monitor alert list.
pub const ALERT_WINDOW: usize = 100;

/// Keeps the newest `capacity` items; the oldest is evicted first.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> TrailingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `item`, returning whatever fell out of the window.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().rev()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T> IntoIterator for &'a TrailingWindow<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
