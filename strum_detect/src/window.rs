//! Gesture stability window.

use std::collections::VecDeque;

use crate::Direction;

/// The last W motion directions.
///
/// Motion is "stable" only once the window is full and every entry equals
/// the current direction.
#[derive(Clone, Debug)]
pub struct GestureWindow {
    capacity:   usize,
    directions: VecDeque<Direction>,
}

impl GestureWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        GestureWindow { capacity, directions: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, direction: Direction) {
        if self.directions.len() >= self.capacity {
            self.directions.pop_front();
        }
        self.directions.push_back(direction);
    }

    pub fn is_stable(&self, current: Direction) -> bool {
        self.directions.len() == self.capacity
            && self.directions.iter().all(|&d| d == current)
    }

    pub fn clear(&mut self) { self.directions.clear(); }

    pub fn len(&self) -> usize { self.directions.len() }

    pub fn is_empty(&self) -> bool { self.directions.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_full_window() {
        let mut w = GestureWindow::new(3);
        w.push(Direction::Down);
        w.push(Direction::Down);
        assert!(!w.is_stable(Direction::Down));
        w.push(Direction::Down);
        assert!(w.is_stable(Direction::Down));
    }

    #[test]
    fn mixed_window_is_unstable() {
        let mut w = GestureWindow::new(3);
        for d in [Direction::Up, Direction::Down, Direction::Down] { w.push(d); }
        assert!(!w.is_stable(Direction::Down));
        w.push(Direction::Down);
        assert!(w.is_stable(Direction::Down));
        assert!(!w.is_stable(Direction::Up));
    }

    #[test]
    fn clear_empties() {
        let mut w = GestureWindow::new(2);
        w.push(Direction::Up);
        w.push(Direction::Up);
        w.clear();
        assert!(w.is_empty());
        assert!(!w.is_stable(Direction::Up));
    }
}
