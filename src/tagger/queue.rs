use std::collections::VecDeque;
use tokio::sync::Mutex;

use crate::tags::TagEntry;

/// FIFO of tags waiting for a flush
///
/// Filled by the interactive task, drained by the ingestion path.
#[derive(Debug, Default)]
pub struct PendingTagQueue {
    tags: Mutex<VecDeque<TagEntry>>,
}

impl PendingTagQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, tag: TagEntry) {
        self.tags.lock().await.push_back(tag);
    }

    pub async fn pop(&self) -> Option<TagEntry> {
        self.tags.lock().await.pop_front()
    }

    /// Take every queued tag at once
    pub async fn take_all(&self) -> Vec<TagEntry> {
        self.tags.lock().await.drain(..).collect()
    }

    pub async fn len(&self) -> usize {
        self.tags.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tags.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagType;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = PendingTagQueue::new();
        queue.push(TagEntry::new(TagType::Event, Duration::ZERO).with_label("first")).await;
        queue.push(TagEntry::new(TagType::Change, Duration::ZERO).with_label("second")).await;

        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.pop().await.unwrap().label, "first");
        assert_eq!(queue.pop().await.unwrap().label, "second");
        assert!(queue.pop().await.is_none());
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_all_empties_queue() {
        let queue = PendingTagQueue::new();
        for label in ["a", "b", "c"] {
            queue.push(TagEntry::new(TagType::Event, Duration::ZERO).with_label(label)).await;
        }
        let labels: Vec<String> = queue.take_all().await.into_iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert!(queue.is_empty().await);
    }
}
