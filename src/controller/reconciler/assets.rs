//! # Documentation Assets
//!
//! Extraction of documentation assets from API packages and their
//! publication through the [`AssetPublisher`].

use tracing::{debug, info};

use crate::controller::reconciler::application::Progress;
use crate::controller::reconciler::types::{SideEffect, SyncError};
use crate::model::{ApiPackage, ApiSpecType, SpecFormat};
use crate::provider::{Asset, AssetFormat, AssetPublisher, AssetType};

/// Assets of every definition of the package that carries a spec
///
/// API definitions come first, then event definitions, each in package order.
#[must_use]
pub fn extract_assets(package: &ApiPackage) -> Vec<Asset> {
    let api_assets = package.api_definitions.iter().filter_map(|definition| {
        let spec = definition.spec.as_ref()?;
        let asset_type = match spec.spec_type {
            ApiSpecType::OpenApi => AssetType::OpenApi,
            ApiSpecType::OData => AssetType::OData,
        };
        Some(asset(&definition.id, &definition.name, asset_type, spec.format, &spec.data))
    });

    let event_assets = package.event_definitions.iter().filter_map(|definition| {
        let spec = definition.spec.as_ref()?;
        Some(asset(
            &definition.id,
            &definition.name,
            AssetType::AsyncApi,
            spec.format,
            &spec.data,
        ))
    });

    api_assets.chain(event_assets).collect()
}

fn asset(id: &str, name: &str, asset_type: AssetType, format: SpecFormat, data: &str) -> Asset {
    Asset {
        id: format!("{}-{}", asset_type.as_str(), id),
        name: name.to_string(),
        asset_type,
        format: match format {
            SpecFormat::Json => AssetFormat::Json,
            SpecFormat::Yaml => AssetFormat::Yaml,
            SpecFormat::Xml => AssetFormat::Xml,
        },
        content: data.to_string(),
    }
}

/// Publish the assets of a new package; packages without assets publish nothing
pub(crate) async fn publish_assets(
    publisher: &dyn AssetPublisher,
    package: &ApiPackage,
    progress: &mut Progress,
) {
    let assets = extract_assets(package);
    if assets.is_empty() {
        debug!("Package {} has no documentation to publish", package.id);
        return;
    }
    put_assets(publisher, package, &assets, progress).await;
}

/// Republish the assets of an existing package; an empty bundle removes the previous one
pub(crate) async fn republish_assets(
    publisher: &dyn AssetPublisher,
    package: &ApiPackage,
    progress: &mut Progress,
) {
    let assets = extract_assets(package);
    if assets.is_empty() {
        delete_assets(publisher, &package.id, progress).await;
        return;
    }
    put_assets(publisher, package, &assets, progress).await;
}

async fn put_assets(
    publisher: &dyn AssetPublisher,
    package: &ApiPackage,
    assets: &[Asset],
    progress: &mut Progress,
) {
    match publisher.put(&package.id, assets).await {
        Ok(()) => {
            info!(
                "Published {} documentation assets for package {}",
                assets.len(),
                package.id
            );
            progress.record(SideEffect::AssetsPublished {
                package_id: package.id.clone(),
            });
        }
        Err(source) => progress.fail(SyncError::PublishAssets {
            package_id: package.id.clone(),
            source,
        }),
    }
}

/// Delete the documentation of a package; a missing bundle counts as deleted
pub(crate) async fn delete_assets(
    publisher: &dyn AssetPublisher,
    package_id: &str,
    progress: &mut Progress,
) {
    match publisher.delete(package_id).await {
        Ok(()) => progress.record(SideEffect::AssetsDeleted {
            package_id: package_id.to_string(),
        }),
        Err(e) if e.is_not_found() => {
            debug!("Documentation for package {} already absent", package_id);
        }
        Err(source) => progress.fail(SyncError::DeleteAssets {
            package_id: package_id.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiDefinition, ApiSpec, EventApiDefinition, EventApiSpec, EventApiSpecType};

    #[test]
    fn test_extract_assets() {
        let package = ApiPackage {
            id: "package1".to_string(),
            api_definitions: vec![
                ApiDefinition {
                    id: "API1".to_string(),
                    name: "orders".to_string(),
                    spec: Some(ApiSpec {
                        data: "openapi: 3.0.0".to_string(),
                        spec_type: ApiSpecType::OpenApi,
                        format: SpecFormat::Yaml,
                    }),
                    ..Default::default()
                },
                ApiDefinition {
                    id: "API2".to_string(),
                    name: "no spec".to_string(),
                    ..Default::default()
                },
                ApiDefinition {
                    id: "API3".to_string(),
                    name: "catalog".to_string(),
                    spec: Some(ApiSpec {
                        data: "<edmx/>".to_string(),
                        spec_type: ApiSpecType::OData,
                        format: SpecFormat::Xml,
                    }),
                    ..Default::default()
                },
            ],
            event_definitions: vec![EventApiDefinition {
                id: "EventAPI1".to_string(),
                name: "order events".to_string(),
                spec: Some(EventApiSpec {
                    data: "{}".to_string(),
                    spec_type: EventApiSpecType::AsyncApi,
                    format: SpecFormat::Json,
                }),
                ..Default::default()
            }],
            ..Default::default()
        };

        let assets = extract_assets(&package);

        let ids: Vec<&str> = assets.iter().map(|asset| asset.id.as_str()).collect();
        assert_eq!(ids, vec!["openapi-API1", "odata-API3", "asyncapi-EventAPI1"]);
        assert_eq!(assets[0].format, AssetFormat::Yaml);
        assert_eq!(assets[0].content, "openapi: 3.0.0");
        assert_eq!(assets[1].asset_type, AssetType::OData);
        assert_eq!(assets[2].asset_type, AssetType::AsyncApi);
        assert_eq!(assets[2].format, AssetFormat::Json);
    }

    #[test]
    fn test_extract_assets_without_specs() {
        let package = ApiPackage {
            id: "package1".to_string(),
            api_definitions: vec![ApiDefinition {
                id: "API1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert!(extract_assets(&package).is_empty());
    }
}
