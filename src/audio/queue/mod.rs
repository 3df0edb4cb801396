//! # Queue Module
//!
//! Ordering containers for a guild's pending tracks.
//!
//! Two policies implement the same [`Queue`] trait:
//!
//! - [`FairQueue`] - round-robin by requester, so nobody can take two
//!   consecutive slots while someone else is waiting
//! - [`LinearQueue`] - strict FIFO
//!
//! Index based operations always work on the logical front-to-back order that
//! [`Queue::list`] returns. An index outside `0..size()` is a caller error and
//! comes back as [`QueueError::IndexOutOfRange`]; nothing is ever clamped.

mod fair;
mod linear;

pub use fair::FairQueue;
pub use linear::LinearQueue;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serenity::model::id::UserId;
use std::{fmt, str::FromStr};

use crate::error::QueueError;

/// Algo que puede encolarse y tiene un solicitante
pub trait Queueable {
    /// `None` agrupa todo el autoplay bajo un mismo solicitante
    fn requester(&self) -> Option<UserId>;
}

/// Contrato común de las colas de un guild
pub trait Queue<T: Queueable>: Send + fmt::Debug {
    fn kind(&self) -> QueueType;

    /// Agrega un item según la política de la cola y devuelve su índice
    fn add(&mut self, item: T) -> usize;

    /// Pone un item al frente, sin política
    fn add_front(&mut self, item: T);

    /// Pone un item al final, sin política
    fn add_back(&mut self, item: T);

    /// Inserta en `index`; `index == size()` agrega al final
    fn add_at(&mut self, index: usize, item: T) -> Result<(), QueueError>;

    /// Saca el siguiente item a reproducir
    fn pull(&mut self) -> Option<T>;

    fn remove(&mut self, index: usize) -> Result<T, QueueError>;

    /// Elimina todas las entradas de `requester` y devuelve cuántas eran
    fn remove_all(&mut self, requester: Option<UserId>) -> usize;

    fn move_item(&mut self, from: usize, to: usize) -> Result<&T, QueueError>;

    /// Mezcla las entradas de `requester` entre los lugares que ya ocupan
    fn shuffle(&mut self, requester: Option<UserId>) -> usize;

    /// Descarta las primeras `count` entradas
    fn skip(&mut self, count: usize) -> usize;

    fn get(&self, index: usize) -> Result<&T, QueueError>;

    fn list(&self) -> &[T];

    fn clear(&mut self);

    fn into_items(self: Box<Self>) -> Vec<T>;

    fn size(&self) -> usize {
        self.list().len()
    }

    fn is_empty(&self) -> bool {
        self.list().is_empty()
    }
}

/// Almacenamiento compartido por ambas políticas
#[derive(Debug)]
pub(crate) struct Entries<T> {
    items: Vec<T>,
}

impl<T: Queueable> Entries<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub(crate) fn items(&self) -> &[T] {
        &self.items
    }

    pub(crate) fn insert(&mut self, index: usize, item: T) {
        self.items.insert(index, item);
    }

    pub(crate) fn push_back(&mut self, item: T) {
        self.items.push(item);
    }

    fn check(&self, index: usize) -> Result<(), QueueError> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(QueueError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }

    pub(crate) fn add_at(&mut self, index: usize, item: T) -> Result<(), QueueError> {
        if index > self.items.len() {
            return Err(QueueError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        self.items.insert(index, item);
        Ok(())
    }

    pub(crate) fn pull(&mut self) -> Option<T> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    pub(crate) fn remove(&mut self, index: usize) -> Result<T, QueueError> {
        self.check(index)?;
        Ok(self.items.remove(index))
    }

    pub(crate) fn remove_all(&mut self, requester: Option<UserId>) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.requester() != requester);
        before - self.items.len()
    }

    pub(crate) fn move_item(&mut self, from: usize, to: usize) -> Result<&T, QueueError> {
        self.check(from)?;
        self.check(to)?;
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(&self.items[to])
    }

    pub(crate) fn shuffle(&mut self, requester: Option<UserId>) -> usize {
        let slots: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.requester() == requester)
            .map(|(index, _)| index)
            .collect();

        let mut order = slots.clone();
        order.shuffle(&mut rand::thread_rng());

        // Aplicar la permutación sobre los mismos slots
        let mut taken: Vec<Option<T>> = self.items.drain(..).map(Some).collect();
        let picked: Vec<T> = order.iter().filter_map(|&i| taken[i].take()).collect();
        for (slot, item) in slots.iter().zip(picked) {
            taken[*slot] = Some(item);
        }
        self.items = taken.into_iter().flatten().collect();

        slots.len()
    }

    pub(crate) fn skip(&mut self, count: usize) -> usize {
        let count = count.min(self.items.len());
        self.items.drain(..count);
        count
    }

    pub(crate) fn get(&self, index: usize) -> Result<&T, QueueError> {
        self.check(index)?;
        Ok(&self.items[index])
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Política de orden configurada por guild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueType {
    Linear,
    #[default]
    Fair,
}

impl QueueType {
    /// Construye una cola de este tipo con las entradas de `previous` en su
    /// orden actual.
    pub fn build<T>(self, previous: Option<Box<dyn Queue<T>>>) -> Box<dyn Queue<T>>
    where
        T: Queueable + Send + fmt::Debug + 'static,
    {
        let items = previous.map(|queue| queue.into_items()).unwrap_or_default();
        match self {
            QueueType::Linear => Box::new(LinearQueue::from_items(items)),
            QueueType::Fair => Box::new(FairQueue::from_items(items)),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            QueueType::Linear => "Linear",
            QueueType::Fair => "Fair",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            QueueType::Linear => "⏺",
            QueueType::Fair => "🔢",
        }
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for QueueType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(QueueType::Linear),
            "fair" => Ok(QueueType::Fair),
            other => anyhow::bail!("Unknown queue type: {}", other),
        }
    }
}
