use chrono::{DateTime, Local};
use std::collections::{HashSet, VecDeque};

use crate::tags::TimeWindow;

/// One device line and the time it arrived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedLogLine {
    pub text: String,
    pub arrival_time: DateTime<Local>,
}

impl TimedLogLine {
    pub fn new(text: impl Into<String>, arrival_time: DateTime<Local>) -> Self {
        Self {
            text: text.into(),
            arrival_time,
        }
    }

    /// Line stamped with the current local time
    pub fn now(text: impl Into<String>) -> Self {
        Self::new(text, Local::now())
    }
}

/// Bounded, arrival-ordered window of recent device lines
///
/// Lines are only ever appended at the tail, so the buffer stays sorted by
/// arrival time. When full, the oldest line is evicted.
#[derive(Debug)]
pub struct LogBuffer {
    lines: VecDeque<TimedLogLine>,
    capacity: usize,
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Append at the tail, returns the evicted line if the buffer was full
    pub fn push(&mut self, line: TimedLogLine) -> Option<TimedLogLine> {
        let evicted = if self.lines.len() >= self.capacity {
            self.lines.pop_front()
        } else {
            None
        };
        self.lines.push_back(line);
        evicted
    }

    /// Lines inside `window` with their positions, oldest first
    pub fn in_window(
        &self,
        window: TimeWindow,
    ) -> impl Iterator<Item = (usize, &TimedLogLine)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .skip_while(move |(_, line)| line.arrival_time < window.start)
            .take_while(move |(_, line)| line.arrival_time <= window.end)
    }

    /// Remove the lines at the given positions
    pub fn remove_positions(&mut self, positions: &HashSet<usize>) -> usize {
        if positions.is_empty() {
            return 0;
        }
        let before = self.lines.len();
        let mut index = 0;
        self.lines.retain(|_| {
            let keep = !positions.contains(&index);
            index += 1;
            keep
        });
        before - self.lines.len()
    }

    /// Drop everything, returns how many lines were held
    pub fn clear(&mut self) -> usize {
        let count = self.lines.len();
        self.lines.clear();
        count
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimedLogLine> {
        self.lines.iter()
    }

    pub fn oldest(&self) -> Option<&TimedLogLine> {
        self.lines.front()
    }

    pub fn newest(&self) -> Option<&TimedLogLine> {
        self.lines.back()
    }
}
