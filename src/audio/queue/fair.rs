use serenity::model::id::UserId;
use std::collections::HashSet;

use super::{Entries, Queue, QueueType, Queueable};
use crate::error::QueueError;

/// Cola round-robin por solicitante.
///
/// Una entrada nueva queda detrás de la última pendiente de su solicitante y
/// luego de la racha siguiente de solicitantes distintos, antes del primero que
/// se repite en esa racha. La rotación sigue el orden en que cada solicitante
/// apareció por primera vez.
#[derive(Debug)]
pub struct FairQueue<T> {
    entries: Entries<T>,
}

impl<T: Queueable> FairQueue<T> {
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    /// Toma las entradas existentes tal cual; sólo intercala lo que se agregue después
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            entries: Entries::new(items),
        }
    }

    fn slot_for(&self, requester: Option<UserId>) -> usize {
        let items = self.entries.items();
        let mut index = items
            .iter()
            .rposition(|item| item.requester() == requester)
            .map_or(0, |last| last + 1);

        let mut seen = HashSet::new();
        while index < items.len() && seen.insert(items[index].requester()) {
            index += 1;
        }
        index
    }
}

impl<T: Queueable> Default for FairQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> for FairQueue<T>
where
    T: Queueable + Send + std::fmt::Debug,
{
    fn kind(&self) -> QueueType {
        QueueType::Fair
    }

    fn add(&mut self, item: T) -> usize {
        let index = self.slot_for(item.requester());
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
