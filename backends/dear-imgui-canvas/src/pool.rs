//! Reusable canvas items backing one render target

use crate::scene::{Rid, SceneServer};

/// Ordered pool of canvas items parented to one root item
///
/// Entry `i` always has draw index `i`. The pool only grows at the tail and
/// shrinks from the tail, so existing items never change draw index.
#[derive(Debug)]
pub struct PrimitivePool {
    root: Rid,
    items: Vec<Rid>,
}

impl PrimitivePool {
    pub fn new(root: Rid) -> Self {
        Self {
            root,
            items: Vec::new(),
        }
    }

    /// The canvas item every pooled item is parented to
    #[inline]
    pub fn root(&self) -> Rid {
        self.root
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Rid> {
        self.items.get(index).copied()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Rid> + '_ {
        self.items.iter().copied()
    }

    /// Grows or trims the pool to exactly `needed` items
    pub fn resize<S: SceneServer + ?Sized>(&mut self, scene: &mut S, needed: usize) {
        let before = self.items.len();

        while self.items.len() < needed {
            let item = scene.canvas_item_create();
            scene.canvas_item_set_parent(item, self.root);
            scene.canvas_item_set_draw_index(item, draw_index(self.items.len()));
            self.items.push(item);
        }

        while self.items.len() > needed {
            if let Some(item) = self.items.pop() {
                scene.free_rid(item);
            }
        }

        if before != needed {
            tracing::trace!(
                target: "dear-imgui-canvas",
                root = self.root.get(),
                before,
                after = needed,
                "resized primitive pool"
            );
        }
    }

    /// Frees every pooled item, leaving the root untouched
    pub fn clear<S: SceneServer + ?Sized>(&mut self, scene: &mut S) {
        for item in self.items.drain(..) {
            scene.free_rid(item);
        }
    }
}

fn draw_index(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}
