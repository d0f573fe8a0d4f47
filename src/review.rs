/// A batch of proposed entities and which of them the user has accepted.
///
/// Items are addressed by index. [`ReviewBatch::commit`] hands back the
/// selected items and empties the batch in the same call, so nothing can be
/// committed twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewBatch<T> {
    items: Vec<T>,
    selected: Vec<bool>,
}

impl<T> Default for ReviewBatch<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: Vec::new(),
        }
    }
}

impl<T> ReviewBatch<T> {
    pub fn new(items: Vec<T>, selected: bool) -> Self {
        let selected = vec![selected; items.len()];
        Self { items, selected }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|s| **s).count()
    }

    /// Flip one item. Returns the new state, or `None` for an out-of-range index.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let flag = self.selected.get_mut(index)?;
        *flag = !*flag;
        Some(*flag)
    }

    pub fn set_selected(&mut self, index: usize, value: bool) -> bool {
        match self.selected.get_mut(index) {
            Some(flag) => {
                *flag = value;
                true
            }
            None => false,
        }
    }

    /// Select or deselect everything.
    pub fn toggle_all(&mut self, value: bool) {
        self.selected.iter_mut().for_each(|s| *s = value);
    }

    /// Take the selected items in their original order and clear the batch.
    pub fn commit(&mut self) -> Vec<T> {
        let items = std::mem::take(&mut self.items);
        let selected = std::mem::take(&mut self.selected);
        items
            .into_iter()
            .zip(selected)
            .filter_map(|(item, keep)| keep.then_some(item))
            .collect()
    }

    /// Drop the batch without committing anything.
    pub fn discard(&mut self) {
        self.items.clear();
        self.selected.clear();
    }
}
