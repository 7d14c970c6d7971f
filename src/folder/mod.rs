//! Folders: ordered child sets typed by a single component kind.
//!
//! Rust's type system gives the membership guarantee for free and at
//! compile time: `Folder<T>` only ever holds `Arc<T>`, so there is no
//! runtime interface check to perform or get wrong. A signal container is
//! simply a component that owns several folders of different concrete `T`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::component::{Component, ComponentBase};
use crate::error::{DaqError, DaqResult, ErrorKind};

/// A predicate consulted by [`Folder::items`] / [`Folder::find_recursive`]
/// to decide which components a search should return and which branches
/// it should descend into.
pub trait SearchFilter<T: ?Sized>: Send + Sync {
    fn accepts_component(&self, item: &Arc<T>) -> bool;

    /// Whether a recursive search should descend into `item`'s own
    /// children. Folders that are not searched recursively can leave this
    /// at the default `false`.
    fn visit_children(&self, _item: &Arc<T>) -> bool {
        false
    }
}

/// Accepts every item and never recurses - the default used by plain
/// `get_items()` calls with no filter.
pub struct AcceptAll;

impl<T: ?Sized> SearchFilter<T> for AcceptAll {
    fn accepts_component(&self, _item: &Arc<T>) -> bool {
        true
    }
}

/// Accepts only visible items.
pub struct VisibleOnly;

impl SearchFilter<dyn Component> for VisibleOnly {
    fn accepts_component(&self, item: &Arc<dyn Component>) -> bool {
        item.visible()
    }

    fn visit_children(&self, _item: &Arc<dyn Component>) -> bool {
        true
    }
}

struct FolderState<T: ?Sized> {
    order: Vec<Arc<T>>,
    by_local_id: HashMap<String, usize>,
}

impl<T: ?Sized> Default for FolderState<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            by_local_id: HashMap::new(),
        }
    }
}

/// An ordered set of children of concrete type `T`, exposed through the
/// component tree via `T: Component`.
pub struct Folder<T: Component + ?Sized + 'static> {
    base: ComponentBase,
    state: RwLock<FolderState<T>>,
}

impl<T: Component + ?Sized + 'static> std::fmt::Debug for Folder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Folder").field("base", &self.base).finish()
    }
}

impl<T: Component + ?Sized + 'static> Folder<T> {
    pub fn new(local_id: impl Into<String>, parent: Option<&Arc<dyn Component>>) -> DaqResult<Arc<Self>> {
        Ok(Arc::new(Self {
            base: ComponentBase::new(local_id, parent)?,
            state: RwLock::new(FolderState::default()),
        }))
    }

    /// Adds an item; fails with `DuplicateItem` if the local ID is already
    /// taken.
    pub fn add_item(&self, item: Arc<T>) -> DaqResult<()> {
        let local_id = item.local_id().to_string();
        let mut state = self.state.write();
        if state.by_local_id.contains_key(&local_id) {
            return Err(DaqError::new(
                ErrorKind::DuplicateItem,
                format!("folder already has an item with local id '{local_id}'"),
            ));
        }
        let slot = state.order.len();
        state.order.push(item);
        state.by_local_id.insert(local_id, slot);
        Ok(())
    }

    pub fn remove_item(&self, item: &Arc<T>) -> DaqResult<()> {
        self.remove_item_with_local_id(item.local_id())
    }

    pub fn remove_item_with_local_id(&self, local_id: &str) -> DaqResult<()> {
        let mut state = self.state.write();
        let slot = state
            .by_local_id
            .remove(local_id)
            .ok_or_else(|| DaqError::new(ErrorKind::NotFound, format!("no item with local id '{local_id}'")))?;
        state.order.remove(slot);
        for idx in state.by_local_id.values_mut() {
            if *idx > slot {
                *idx -= 1;
            }
        }
        Ok(())
    }

    pub fn has_item(&self, local_id: &str) -> bool {
        self.state.read().by_local_id.contains_key(local_id)
    }

    pub fn get_item(&self, local_id: &str) -> Option<Arc<T>> {
        let state = self.state.read();
        state.by_local_id.get(local_id).map(|&slot| state.order[slot].clone())
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    /// Returns visible children in insertion order, honoring `filter`.
    pub fn items(&self, filter: Option<&dyn SearchFilter<T>>) -> Vec<Arc<T>> {
        let state = self.state.read();
        match filter {
            Some(f) => state.order.iter().filter(|item| f.accepts_component(item)).cloned().collect(),
            None => state.order.clone(),
        }
    }

    pub fn all_items(&self) -> Vec<Arc<T>> {
        self.state.read().order.clone()
    }
}

impl<T: Component + ?Sized + 'static> Component for Folder<T> {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn child_components(&self) -> Vec<Arc<dyn Component>> {
        self.state
            .read()
            .order
            .iter()
            .map(|item| item.clone() as Arc<dyn Component>)
            .collect()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    #[derive(Debug)]
    struct Leaf {
        base: ComponentBase,
    }

    impl Component for Leaf {
        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn leaf(local_id: &str) -> Arc<Leaf> {
        Arc::new(Leaf {
            base: ComponentBase::new(local_id, None).unwrap(),
        })
    }

    #[test]
    fn add_then_duplicate_fails() {
        let folder: Arc<Folder<Leaf>> = Folder::new("items", None).unwrap();
        folder.add_item(leaf("a")).unwrap();
        let err = folder.add_item(leaf("a")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateItem);
    }

    #[test]
    fn remove_preserves_remaining_order() {
        let folder: Arc<Folder<Leaf>> = Folder::new("items", None).unwrap();
        folder.add_item(leaf("a")).unwrap();
        folder.add_item(leaf("b")).unwrap();
        folder.add_item(leaf("c")).unwrap();
        folder.remove_item_with_local_id("b").unwrap();
        let ids: Vec<_> = folder.all_items().iter().map(|i| i.local_id().to_string()).collect();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn folder_exposes_children_to_the_component_tree() {
        let folder: Arc<Folder<Leaf>> = Folder::new("items", None).unwrap();
        folder.add_item(leaf("a")).unwrap();
        let component: &dyn Component = &*folder;
        assert_eq!(component.child_components().len(), 1);
    }
}
