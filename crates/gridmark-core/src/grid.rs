//! The reference grid layer and its synchronisation with the model.

use crate::geo::{Bounds, FeatureCollection};
use crate::model::{Model, ModelResult};

/// Read-only layer holding the server-computed grid.
#[derive(Debug, Clone, Default)]
pub struct GridLayer {
    collection: FeatureCollection,
}

impl GridLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn clear(&mut self) {
        self.collection = FeatureCollection::default();
    }

    pub fn replace(&mut self, collection: FeatureCollection) {
        self.collection = collection;
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.collection.bounds()
    }

    pub fn collection(&self) -> &FeatureCollection {
        &self.collection
    }

    /// Clear the layer and refill it from the model.
    ///
    /// On a failed fetch the layer stays cleared and the error is returned.
    /// Returns the bounds of the new grid, if any.
    pub async fn refresh<M: Model + ?Sized>(&mut self, model: &M) -> ModelResult<Option<Bounds>> {
        self.clear();
        if let Some(collection) = model.grid().await? {
            self.replace(collection);
        }
        Ok(self.bounds())
    }
}
