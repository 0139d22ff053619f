//! Week navigator state machine.
//!
//! Holds the pages of one recap and the page currently shown. All user
//! interaction goes through [`Navigator::handle`], which returns what the
//! bound message should look like afterwards. The Discord side lives in
//! [`crate::discord::session`].

use crate::error::{BotError, Result};
use crate::recap::Page;

/// A navigation request from the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    Previous,
    Next,
    /// Back to the most recent week
    Reset,
    /// Absolute page index, as offered by the week picker
    JumpTo(usize),
}

/// What to show after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Render {
    pub index: usize,
    pub previous_disabled: bool,
    pub next_disabled: bool,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    pages: Vec<Page>,
    index: usize,
}

impl Navigator {
    /// Start on the last (most recent) page. Pages must be week-ascending.
    pub fn new(pages: Vec<Page>) -> Result<Self> {
        if pages.is_empty() {
            return Err(BotError::NoRecapData {
                detail: "nothing to paginate".to_string(),
            });
        }
        let index = pages.len() - 1;
        Ok(Self { pages, index })
    }

    pub fn handle(&mut self, event: NavEvent) -> Render {
        let last = self.last_index();
        self.index = match event {
            NavEvent::Previous => self.index.saturating_sub(1),
            NavEvent::Next => (self.index + 1).min(last),
            NavEvent::Reset => last,
            NavEvent::JumpTo(i) if i <= last => i,
            NavEvent::JumpTo(_) => self.index,
        };
        self.render()
    }

    pub fn render(&self) -> Render {
        Render {
            index: self.index,
            previous_disabled: self.index == 0,
            next_disabled: self.index == self.last_index(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_page(&self) -> &Page {
        &self.pages[self.index]
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    fn last_index(&self) -> usize {
        self.pages.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(n: u32) -> Vec<Page> {
        (1..=n).map(|week| Page { week, cards: vec![] }).collect()
    }

    #[test]
    fn test_starts_on_last_page() {
        let nav = Navigator::new(pages(5)).unwrap();
        assert_eq!(nav.index(), 4);
        assert_eq!(nav.current_page().week, 5);
        let render = nav.render();
        assert!(!render.previous_disabled);
        assert!(render.next_disabled);
    }

    #[test]
    fn test_empty_pages_rejected() {
        assert!(matches!(
            Navigator::new(vec![]),
            Err(BotError::NoRecapData { .. })
        ));
    }

    #[test]
    fn test_previous_floors_at_zero() {
        let mut nav = Navigator::new(pages(3)).unwrap();
        nav.handle(NavEvent::Previous);
        nav.handle(NavEvent::Previous);
        let render = nav.handle(NavEvent::Previous);
        assert_eq!(render.index, 0);
        assert!(render.previous_disabled);
        assert!(!render.next_disabled);

        // No-op at the floor
        assert_eq!(nav.handle(NavEvent::Previous).index, 0);
    }

    #[test]
    fn test_next_caps_at_last() {
        let mut nav = Navigator::new(pages(3)).unwrap();
        assert_eq!(nav.handle(NavEvent::Next).index, 2);
        nav.handle(NavEvent::JumpTo(0));
        nav.handle(NavEvent::Next);
        assert_eq!(nav.handle(NavEvent::Next).index, 2);
    }

    #[test]
    fn test_index_stays_in_bounds_for_any_sequence() {
        // Deterministic pseudo-random walk over previous/next
        let mut nav = Navigator::new(pages(7)).unwrap();
        let mut state: u32 = 12345;
        for _ in 0..1000 {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            let event = if state & 0x100 == 0 {
                NavEvent::Previous
            } else {
                NavEvent::Next
            };
            let render = nav.handle(event);
            assert!(render.index < 7);
            assert_eq!(render.previous_disabled, render.index == 0);
            assert_eq!(render.next_disabled, render.index == 6);
        }
    }

    #[test]
    fn test_reset_returns_to_last() {
        for start in 0..4 {
            let mut nav = Navigator::new(pages(4)).unwrap();
            nav.handle(NavEvent::JumpTo(start));
            assert_eq!(nav.handle(NavEvent::Reset).index, 3);
        }
    }

    #[test]
    fn test_jump_to_sets_exact_index() {
        let mut nav = Navigator::new(pages(6)).unwrap();
        for n in 0..6 {
            assert_eq!(nav.handle(NavEvent::JumpTo(n)).index, n);
            assert_eq!(nav.current_page().week, n as u32 + 1);
        }
    }

    #[test]
    fn test_jump_out_of_range_is_ignored() {
        let mut nav = Navigator::new(pages(3)).unwrap();
        nav.handle(NavEvent::JumpTo(1));
        assert_eq!(nav.handle(NavEvent::JumpTo(9)).index, 1);
    }

    #[test]
    fn test_single_page_disables_both() {
        let mut nav = Navigator::new(pages(1)).unwrap();
        let render = nav.handle(NavEvent::Next);
        assert_eq!(render.index, 0);
        assert!(render.previous_disabled);
        assert!(render.next_disabled);
    }
}
