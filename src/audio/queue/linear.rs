use serenity::model::id::UserId;

use super::{Entries, Queue, QueueType, Queueable};
use crate::error::QueueError;

/// Cola FIFO estricta
#[derive(Debug)]
pub struct LinearQueue<T> {
    entries: Entries<T>,
}

impl<T: Queueable> LinearQueue<T> {
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            entries: Entries::new(items),
        }
    }
}

impl<T: Queueable> Default for LinearQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> for LinearQueue<T>
where
    T: Queueable + Send + std::fmt::Debug,
{
    fn kind(&self) -> QueueType {
        QueueType::Linear
    }

    fn add(&mut self, item: T) -> usize {
        let index = self.entries.items().len();
        self.entries.insert(index, item);
        index
    }

    fn add_front(&mut self, item: T) {
        self.entries.insert(0, item);
    }

    fn add_back(&mut self, item: T) {
        self.entries.push_back(item);
    }

    fn add_at(&mut self, index: usize, item: T) -> Result<(), QueueError> {
        self.entries.add_at(index, item)
    }

    fn pull(&mut self) -> Option<T> {
        self.entries.pull()
    }

    fn remove(&mut self, index: usize) -> Result<T, QueueError> {
        self.entries.remove(index)
    }

    fn remove_all(&mut self, requester: Option<UserId>) -> usize {
        self.entries.remove_all(requester)
    }

    fn move_item(&mut self, from: usize, to: usize) -> Result<&T, QueueError> {
        self.entries.move_item(from, to)
    }

    fn shuffle(&mut self, requester: Option<UserId>) -> usize {
        self.entries.shuffle(requester)
    }

    fn skip(&mut self, count: usize) -> usize {
        self.entries.skip(count)
    }

    fn get(&self, index: usize) -> Result<&T, QueueError> {
        self.entries.get(index)
    }

    fn list(&self) -> &[T] {
        self.entries.items()
    }

    fn clear(&mut self) {
        self.entries.clear()
    }

    fn into_items(self: Box<Self>) -> Vec<T> {
        self.entries.into_items()
    }
}
