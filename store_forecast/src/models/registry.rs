//! Versioned model registry
//!
//! Holds every fitted model keyed by (tenant, target, version). Retraining
//! supersedes, never overwrites: prior versions stay addressable for
//! rollback and drift comparison. The registry is injected into the forecast
//! service rather than living as ambient global state.

use crate::data::{Target, TenantId};
use crate::error::{ForecastError, Result};
use crate::models::{FittedModel, ModelKind, ModelVersion, TrainedModel};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// A fitted model together with its artifact metadata
#[derive(Debug, Clone)]
pub struct StoredModel {
    pub artifact: TrainedModel,
    pub model: Arc<dyn FittedModel>,
}

#[derive(Debug, Default)]
struct TargetModels {
    versions: Vec<StoredModel>,
    /// Currently serving version per algorithm kind
    active: HashMap<ModelKind, ModelVersion>,
    next_version: u32,
}

/// Registry of trained models for all tenants
#[derive(Debug, Default)]
pub struct ModelRegistry {
    entries: HashMap<(TenantId, Target), TargetModels>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly trained model and make it the active version for its
    /// kind. Returns the assigned version.
    pub fn register(
        &mut self,
        tenant: &TenantId,
        mut artifact: TrainedModel,
        model: Arc<dyn FittedModel>,
    ) -> ModelVersion {
        let entry = self
            .entries
            .entry((tenant.clone(), artifact.target))
            .or_default();

        entry.next_version += 1;
        let version = ModelVersion(entry.next_version);
        artifact.version = version;

        info!(
            tenant = %tenant,
            target = %artifact.target,
            kind = %artifact.kind,
            %version,
            mae = artifact.metrics.mae,
            "registered model"
        );

        entry.active.insert(artifact.kind, version);
        entry.versions.push(StoredModel { artifact, model });
        version
    }

    /// Look up a specific version
    pub fn get(
        &self,
        tenant: &TenantId,
        target: Target,
        version: ModelVersion,
    ) -> Option<&StoredModel> {
        self.entries
            .get(&(tenant.clone(), target))?
            .versions
            .iter()
            .find(|m| m.artifact.version == version)
    }

    /// The models currently serving this tenant and target, one per kind,
    /// ordered by kind for deterministic iteration
    pub fn active_models(&self, tenant: &TenantId, target: Target) -> Vec<&StoredModel> {
        let Some(entry) = self.entries.get(&(tenant.clone(), target)) else {
            return Vec::new();
        };
        let mut out: Vec<&StoredModel> = entry
            .active
            .values()
            .filter_map(|v| entry.versions.iter().find(|m| m.artifact.version == *v))
            .collect();
        out.sort_by_key(|m| m.artifact.version);
        out
    }

    /// Every version ever registered for this tenant and target
    pub fn versions(&self, tenant: &TenantId, target: Target) -> Vec<&TrainedModel> {
        self.entries
            .get(&(tenant.clone(), target))
            .map(|e| e.versions.iter().map(|m| &m.artifact).collect())
            .unwrap_or_default()
    }

    /// Re-activate a previously registered version for its kind
    pub fn rollback(
        &mut self,
        tenant: &TenantId,
        target: Target,
        version: ModelVersion,
    ) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&(tenant.clone(), target))
            .ok_or_else(|| {
                ForecastError::Validation(format!("No models registered for tenant {}", tenant))
            })?;

        let kind = entry
            .versions
            .iter()
            .find(|m| m.artifact.version == version)
            .map(|m| m.artifact.kind)
            .ok_or_else(|| {
                ForecastError::Validation(format!("Unknown model version {}", version))
            })?;

        info!(tenant = %tenant, target = %target, %version, "rolled back to prior model");
        entry.active.insert(kind, version);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
