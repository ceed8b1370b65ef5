use anyhow::Result;
use once_cell::unsync::OnceCell;

/// A lazily loaded value that can be thrown away and reloaded.
///
/// Loading happens at most once between invalidations. A failed load
/// leaves the slot empty, so the next access retries.
#[derive(Debug)]
pub struct Cached<T> {
    cell: OnceCell<T>,
}

impl<T> Cached<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn ensure_loaded<F>(&self, load: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.cell.get_or_try_init(load)
    }

    pub fn invalidate(&mut self) {
        self.cell.take();
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self::new()
    }
}
