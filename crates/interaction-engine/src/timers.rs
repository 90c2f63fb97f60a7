//! Deadline table for the aggregation windows.
//!
//! Nothing here sleeps: the host asks for [`TimerTable::next`] and calls
//! back once that instant has passed.

use pagewire_core_types::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timer {
    Typing,
    Scroll,
    Dwell(NodeId),
}

#[derive(Clone, Debug, Default)]
pub struct TimerTable {
    typing: Option<i64>,
    scroll: Option<i64>,
    dwell: Option<(NodeId, i64)>,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms (or re-arms) `timer` to fire at `at`. Only one dwell timer
    /// exists at a time.
    pub fn arm(&mut self, timer: Timer, at: i64) {
        match timer {
            Timer::Typing => self.typing = Some(at),
            Timer::Scroll => self.scroll = Some(at),
            Timer::Dwell(node) => self.dwell = Some((node, at)),
        }
    }

    pub fn cancel(&mut self, timer: Timer) {
        match timer {
            Timer::Typing => self.typing = None,
            Timer::Scroll => self.scroll = None,
            Timer::Dwell(_) => self.dwell = None,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn deadline(&self, timer: Timer) -> Option<i64> {
        match timer {
            Timer::Typing => self.typing,
            Timer::Scroll => self.scroll,
            Timer::Dwell(node) => self.dwell.filter(|(n, _)| *n == node).map(|(_, at)| at),
        }
    }

    pub fn next(&self) -> Option<i64> {
        [self.typing, self.scroll, self.dwell.map(|(_, at)| at)]
            .into_iter()
            .flatten()
            .min()
    }

    pub fn is_empty(&self) -> bool {
        self.next().is_none()
    }

    /// Removes and returns every timer due at `now` with its deadline,
    /// earliest first.
    pub fn take_due(&mut self, now: i64) -> Vec<(Timer, i64)> {
        let mut due: Vec<(i64, Timer)> = Vec::new();
        if let Some(at) = self.typing.filter(|at| *at <= now) {
            due.push((at, Timer::Typing));
            self.typing = None;
        }
        if let Some(at) = self.scroll.filter(|at| *at <= now) {
            due.push((at, Timer::Scroll));
            self.scroll = None;
        }
        if let Some((node, at)) = self.dwell.filter(|(_, at)| *at <= now) {
            due.push((at, Timer::Dwell(node)));
            self.dwell = None;
        }
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(at, timer)| (timer, at)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_timers_fire_in_deadline_order() {
        let mut table = TimerTable::new();
        table.arm(Timer::Typing, 500);
        table.arm(Timer::Scroll, 150);
        table.arm(Timer::Dwell(NodeId(4)), 300);
        assert_eq!(table.next(), Some(150));
        assert_eq!(table.take_due(100), vec![]);
        assert_eq!(
            table.take_due(400),
            vec![(Timer::Scroll, 150), (Timer::Dwell(NodeId(4)), 300)]
        );
        assert_eq!(table.next(), Some(500));
    }

    #[test]
    fn rearming_replaces_the_deadline() {
        let mut table = TimerTable::new();
        table.arm(Timer::Typing, 500);
        table.arm(Timer::Typing, 900);
        assert!(table.take_due(600).is_empty());
        table.arm(Timer::Dwell(NodeId(1)), 300);
        table.arm(Timer::Dwell(NodeId(2)), 350);
        assert_eq!(table.deadline(Timer::Dwell(NodeId(1))), None);
        table.clear();
        assert!(table.is_empty());
    }
}
