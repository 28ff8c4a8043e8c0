/// Count-based window over the most recent items
///
/// Backed by a ring buffer with a write cursor, so pushing never shifts the
/// stored items. While the window is filling up, [`SlidingWindow::items`]
/// returns only the items seen so far; nothing is padded.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    slots: Vec<T>,
    size: usize,
    cursor: usize,
}

impl<T: Clone> SlidingWindow<T> {
    /// A window of `size` items; a size of zero is treated as one
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            slots: Vec::with_capacity(size),
            size,
            cursor: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.size
    }

    /// Add an item, evicting the oldest one once the window is full
    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.size {
            self.slots.push(item);
            return;
        }
        self.slots[self.cursor] = item;
        self.cursor = (self.cursor + 1) % self.size;
    }

    /// Window contents, oldest first
    pub fn items(&self) -> Vec<T> {
        let (newer, older) = self.slots.split_at(self.cursor);
        older.iter().chain(newer).cloned().collect()
    }
}
