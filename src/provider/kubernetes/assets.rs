//! Documentation bundles as `ConfigMap`s.
//!
//! Each package gets a `docs-{package}` ConfigMap. Every asset is stored under
//! `{asset id}.{extension}` and `assets.json` lists the asset metadata.
//! ConfigMaps are limited to 1 MiB, larger bundles are rejected by the API server.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{observe, KubernetesBackend};
use crate::constants::ASSETS_INDEX_KEY;
use crate::provider::naming::{assets_bundle_name, sanitize_data_key};
use crate::provider::{Asset, AssetPublisher, StoreError};

const STORE: &str = "assets";
const KIND: &str = "ConfigMap";

#[derive(Debug, Clone)]
pub struct ConfigMapAssetPublisher {
    backend: KubernetesBackend,
}

impl ConfigMapAssetPublisher {
    pub(super) fn new(backend: KubernetesBackend) -> Self {
        Self { backend }
    }

    fn api(&self) -> Api<ConfigMap> {
        Api::namespaced(self.backend.client.clone(), &self.backend.namespace)
    }
}

/// ConfigMap data for a bundle: one key per asset plus the index
pub(super) fn bundle_data(assets: &[Asset]) -> Result<BTreeMap<String, String>, StoreError> {
    let index = serde_json::to_string(assets).map_err(|source| StoreError::Serialization {
        what: "asset index",
        source,
    })?;

    let mut data: BTreeMap<String, String> = assets
        .iter()
        .map(|asset| {
            let key = sanitize_data_key(&format!("{}.{}", asset.id, asset.format.extension()));
            (key, asset.content.clone())
        })
        .collect();
    data.insert(ASSETS_INDEX_KEY.to_string(), index);
    Ok(data)
}

#[async_trait]
impl AssetPublisher for ConfigMapAssetPublisher {
    async fn put(&self, package_id: &str, assets: &[Asset]) -> Result<(), StoreError> {
        observe(STORE, "put", async {
            let name = assets_bundle_name(package_id);
            let config_map = ConfigMap {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    namespace: Some(self.backend.namespace.clone()),
                    labels: Some(self.backend.package_labels(None, package_id)),
                    ..Default::default()
                },
                data: Some(bundle_data(assets)?),
                ..Default::default()
            };

            self.api()
                .patch(
                    &name,
                    &PatchParams::apply(&self.backend.field_manager).force(),
                    &Patch::Apply(&config_map),
                )
                .await
                .map_err(|e| StoreError::from_kube(KIND, &name, e))?;

            info!(
                "Published {} documentation assets for package {} to {}/{}",
                assets.len(),
                package_id,
                self.backend.namespace,
                name
            );
            Ok(())
        })
        .await
    }

    async fn delete(&self, package_id: &str) -> Result<(), StoreError> {
        observe(STORE, "delete", async {
            let name = assets_bundle_name(package_id);
            self.api()
                .delete(&name, &DeleteParams::default())
                .await
                .map_err(|e| StoreError::from_kube(KIND, &name, e))?;
            debug!(
                "Deleted documentation bundle {}/{}",
                self.backend.namespace, name
            );
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{AssetFormat, AssetType};

    #[test]
    fn test_bundle_data() {
        let assets = vec![Asset {
            id: "openapi-API1".to_string(),
            name: "orders".to_string(),
            asset_type: AssetType::OpenApi,
            format: AssetFormat::Yaml,
            content: "openapi: 3.0.0".to_string(),
        }];

        let data = bundle_data(&assets).unwrap();
        assert_eq!(
            data.get("openapi-API1.yaml").map(String::as_str),
            Some("openapi: 3.0.0")
        );
        let index = data.get("assets.json").unwrap();
        assert!(index.contains(r#""type":"openapi""#));
        assert!(!index.contains("openapi: 3.0.0"));
    }
}
