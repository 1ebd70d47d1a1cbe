use runtime::budget::FrameBudget;

use crate::cache::TextureKey;

/// Fetch ordering: navigation loads always drain before prefetch warming.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadPriority {
    Navigation,
    Prefetch,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoadQueueFull {
    pub max_pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedLoad {
    pub key: TextureKey,
    pub url: String,
}

#[derive(Debug)]
struct Item {
    ticket: LoadTicket,
    priority: LoadPriority,
    load: QueuedLoad,
    canceled: bool,
}

/// Deterministic pending-fetch queue.
///
/// - Total ordering on `(priority, ticket)`; equal priorities drain in
///   insertion order.
/// - Pushing a key that is already pending returns the existing ticket
///   (the cache's in-flight dedup extends to the queue).
/// - Cancellation does not perturb the order of remaining items.
#[derive(Debug, Default)]
pub struct LoadQueue {
    next_ticket: u64,
    items: Vec<Item>,
    max_pending: Option<usize>,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            max_pending: Some(max_pending),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.iter().filter(|i| !i.canceled).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, priority: LoadPriority, load: QueuedLoad) -> LoadTicket {
        if let Some(existing) = self
            .items
            .iter()
            .find(|i| !i.canceled && i.load.key == load.key)
        {
            return existing.ticket;
        }
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.items.push(Item {
            ticket,
            priority,
            load,
            canceled: false,
        });
        ticket
    }

    pub fn try_push(
        &mut self,
        priority: LoadPriority,
        load: QueuedLoad,
    ) -> Result<LoadTicket, LoadQueueFull> {
        let duplicate = self
            .items
            .iter()
            .any(|i| !i.canceled && i.load.key == load.key);
        if !duplicate {
            if let Some(max_pending) = self.max_pending {
                if self.len() >= max_pending {
                    return Err(LoadQueueFull { max_pending });
                }
            }
        }
        Ok(self.push(priority, load))
    }

    pub fn cancel(&mut self, ticket: LoadTicket) -> bool {
        if let Some(item) = self.items.iter_mut().find(|i| i.ticket == ticket) {
            item.canceled = true;
            return true;
        }
        false
    }

    pub fn pop_next(&mut self) -> Option<QueuedLoad> {
        let idx = self.best_index()?;
        Some(self.items.swap_remove(idx).load)
    }

    /// Pops the next load only if the frame still has a decode slot. If the
    /// budget is spent this returns `None` without reordering anything.
    pub fn pop_next_with_budget(&mut self, budget: &mut FrameBudget) -> Option<QueuedLoad> {
        let idx = self.best_index()?;
        if !budget.take_slot() {
            return None;
        }
        Some(self.items.swap_remove(idx).load)
    }

    fn best_index(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (idx, item) in self.items.iter().enumerate() {
            if item.canceled {
                continue;
            }
            match best {
                None => best = Some(idx),
                Some(b) => {
                    let cur = (&self.items[b].priority, self.items[b].ticket);
                    if (&item.priority, item.ticket) < cur {
                        best = Some(idx);
                    }
                }
            }
        }
        best
    }
}
