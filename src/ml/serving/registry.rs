//! Model Registry Module
//!
//! Thread-safe map from caller-chosen model ids to trained models. Writers
//! replace whole entries (last write wins) and readers receive an `Arc`, so a
//! prediction never observes a half-written model.

use crate::core::error::{Error, Result};
use crate::ml::serving::TrainedModel;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory model registry
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<String, Arc<TrainedModel>>>,
}

fn poisoned<T>(_: T) -> Error {
    Error::Analysis("model registry lock poisoned".into())
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a model, returning the one it replaced
    pub fn insert(
        &self,
        model_id: impl Into<String>,
        model: TrainedModel,
    ) -> Result<Option<Arc<TrainedModel>>> {
        let model_id = model_id.into();
        let mut models = self.models.write().map_err(poisoned)?;
        let previous = models.insert(model_id.clone(), Arc::new(model));
        if previous.is_some() {
            log::info!(model_id:% = model_id; "replaced registered model");
        }
        Ok(previous)
    }

    /// Look up a model
    pub fn get(&self, model_id: &str) -> Result<Arc<TrainedModel>> {
        let models = self.models.read().map_err(poisoned)?;
        models
            .get(model_id)
            .cloned()
            .ok_or_else(|| Error::ModelNotFound(model_id.to_string()))
    }

    pub fn contains(&self, model_id: &str) -> Result<bool> {
        Ok(self.models.read().map_err(poisoned)?.contains_key(model_id))
    }

    /// Registered ids, sorted
    pub fn model_ids(&self) -> Result<Vec<String>> {
        let models = self.models.read().map_err(poisoned)?;
        let mut ids: Vec<String> = models.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.models.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
