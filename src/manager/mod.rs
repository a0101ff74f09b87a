//! Manager module - Applies, waits for and deletes sets of objects.
//!
//! A [`ResourceManager`] drives a [`ClusterClient`] through server-side
//! apply: every object is dry-run first, stale ownership metadata is cleaned
//! up, and only objects that would actually change are written.

mod apply;
mod delete;
mod options;
mod sort;
mod wait;


pub use apply::*;
pub use options::*;
pub use sort::*;

use crate::client::{ClientError, ClusterClient, Context, PatchOptions, PatchSpec};
use crate::drift::DriftDetector;
use crate::error::ApplyError;
use crate::object::{Object, ObjectRef};
use crate::sanitize::Sanitizer;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Owner identifies the engine to the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Field manager name used for every write.
    pub field: String,
    /// Label prefix used by [`ResourceManager::set_owner_labels`].
    pub group: String,
}

impl Owner {
    /// Stamps every object with `{group}/name` and `{group}/namespace` labels.
    pub fn set_labels(&self, objects: &mut [Object], name: &str, namespace: &str) {
        let name_key = format!("{}/name", self.group);
        let namespace_key = format!("{}/namespace", self.group);
        for object in objects {
            object.set_label(name_key.as_str(), name);
            object.set_label(namespace_key.as_str(), namespace);
        }
    }
}

impl Default for Owner {
    fn default() -> Self {
        Owner {
            field: "kube-ssa".to_string(),
            group: "kube-ssa.io".to_string(),
        }
    }
}

/// Engine configuration, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagerConfig {
    pub owner: Owner,
    /// Managers whose `Update` entries are removed from live objects.
    pub legacy_update_managers: Vec<String>,
    /// Manager whose `Apply` entries are removed from live objects.
    pub legacy_apply_manager: String,
    /// Seconds between readiness polls during staged apply.
    pub poll_interval_seconds: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            owner: Owner::default(),
            legacy_update_managers: vec!["kubectl".to_string(), "before-first-apply".to_string()],
            legacy_apply_manager: "kubectl".to_string(),
            poll_interval_seconds: 2,
        }
    }
}

impl ManagerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

/// ResourceManagerBuilder is a builder for creating a ResourceManager.
#[derive(Debug, Clone)]
pub struct ResourceManagerBuilder {
    config: ManagerConfig,
    poll_interval: Duration,
}

impl Default for ResourceManagerBuilder {
    fn default() -> Self {
        ResourceManagerBuilder::from_config(ManagerConfig::default())
    }
}

impl ResourceManagerBuilder {
    /// Creates a new ResourceManagerBuilder with the default configuration.
    pub fn new() -> Self {
        ResourceManagerBuilder::default()
    }

    /// Starts from a loaded configuration.
    pub fn from_config(config: ManagerConfig) -> Self {
        let poll_interval = Duration::from_secs(config.poll_interval_seconds);
        ResourceManagerBuilder {
            config,
            poll_interval,
        }
    }

    /// Sets the field manager and label group.
    pub fn owner(mut self, field: impl Into<String>, group: impl Into<String>) -> Self {
        self.config.owner = Owner {
            field: field.into(),
            group: group.into(),
        };
        self
    }

    /// Replaces the legacy update managers.
    pub fn legacy_update_managers<I, S>(mut self, managers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.legacy_update_managers = managers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the legacy apply manager.
    pub fn legacy_apply_manager(mut self, manager: impl Into<String>) -> Self {
        self.config.legacy_apply_manager = manager.into();
        self
    }

    /// Sets the readiness poll interval used by staged apply.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Builds the ResourceManager around `client`.
    pub fn build<C: ClusterClient>(self, client: C) -> ResourceManager<C> {
        let config = self.config;
        let sanitizer = Sanitizer::new(
            config.owner.field.clone(),
            config.legacy_update_managers,
            config.legacy_apply_manager,
        );
        ResourceManager {
            client,
            owner: config.owner,
            sanitizer,
            detector: DriftDetector::new(),
            poll_interval: self.poll_interval,
        }
    }
}

/// ResourceManager reconciles desired objects with the object store.
///
/// It holds no state between calls; concurrent calls on one manager are
/// independent of each other.
pub struct ResourceManager<C> {
    client: C,
    owner: Owner,
    sanitizer: Sanitizer,
    detector: DriftDetector,
    poll_interval: Duration,
}

impl ResourceManager<()> {
    /// Creates a new ResourceManagerBuilder.
    pub fn builder() -> ResourceManagerBuilder {
        ResourceManagerBuilder::new()
    }
}

impl<C: ClusterClient> ResourceManager<C> {
    pub fn new(client: C) -> Self {
        ResourceManagerBuilder::new().build(client)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Labels objects as belonging to this owner, see [`Owner::set_labels`].
    pub fn set_owner_labels(&self, objects: &mut [Object], name: &str, namespace: &str) {
        self.owner.set_labels(objects, name, namespace);
    }

    /// Fetches the live object, mapping absence to `None`.
    async fn fetch(&self, ctx: &Context, object: &Object) -> Result<Option<Object>, ApplyError> {
        match ctx.run(self.client.get(object)).await.map_err(interrupted(object))? {
            Ok(existing) => Ok(existing),
            Err(e) if e.is_not_found() => Ok(None),
            Err(source) => Err(ApplyError::Fetch {
                object: object.object_ref(),
                source,
            }),
        }
    }

    /// Server-side apply in dry-run mode. The client error is handed back
    /// unmapped so callers can classify it.
    async fn dry_run(
        &self,
        ctx: &Context,
        object: &Object,
    ) -> Result<Result<Object, ClientError>, ApplyError> {
        let options = PatchOptions::new(&self.owner.field).dry_run().force();
        ctx.run(self.client.patch(object, &PatchSpec::Apply, &options))
            .await
            .map_err(interrupted(object))
    }

    async fn write(&self, ctx: &Context, object: &Object) -> Result<Object, ApplyError> {
        let options = PatchOptions::new(&self.owner.field).force();
        ctx.run(self.client.patch(object, &PatchSpec::Apply, &options))
            .await
            .map_err(interrupted(object))?
            .map_err(|source| ApplyError::Write {
                object: object.object_ref(),
                source,
            })
    }
}

fn interrupted(object: &Object) -> impl FnOnce(crate::client::Cancelled) -> ApplyError {
    let object: ObjectRef = object.object_ref();
    move |cause| ApplyError::Cancelled {
        object: Some(object),
        cause,
    }
}
