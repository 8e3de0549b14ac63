//! # Diff
//!
//! Three-way split of desired against existing applications, and the same
//! split one level down for packages against services. Matching is by
//! application name and by package id.

use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::crd::{RuntimeApplication, Service};
use crate::model::{ApiPackage, Application};

/// Desired application matched with its existing runtime record
#[derive(Debug, Clone, Copy)]
pub struct UpdatePair<'a> {
    pub desired: &'a Application,
    pub existing: &'a RuntimeApplication,
}

#[derive(Debug, Default)]
pub struct ApplicationDiff<'a> {
    /// Desired order
    pub to_create: Vec<&'a Application>,
    /// Desired order
    pub to_update: Vec<UpdatePair<'a>>,
    /// Existing order
    pub to_delete: Vec<&'a RuntimeApplication>,
}

impl ApplicationDiff<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Split desired applications against existing managed records
///
/// Duplicate desired names keep their first occurrence.
#[must_use]
pub fn diff_applications<'a>(
    desired: &'a [Application],
    existing: &'a [RuntimeApplication],
) -> ApplicationDiff<'a> {
    let desired = dedup_by_key(desired, |app| app.name.as_str(), "application");
    let existing = dedup_by_key(existing, RuntimeApplication::name_str, "runtime application");

    let existing_by_name: HashMap<&str, &RuntimeApplication> = existing
        .iter()
        .map(|app| (app.name_str(), *app))
        .collect();
    let desired_names: HashSet<&str> = desired.iter().map(|app| app.name.as_str()).collect();

    let mut diff = ApplicationDiff::default();
    for app in desired.iter().copied() {
        match existing_by_name.get(app.name.as_str()) {
            Some(&existing) => diff.to_update.push(UpdatePair {
                desired: app,
                existing,
            }),
            None => diff.to_create.push(app),
        }
    }
    diff.to_delete = existing
        .into_iter()
        .filter(|app| !desired_names.contains(app.name_str()))
        .collect();
    diff
}

#[derive(Debug, Default)]
pub struct PackageDiff<'a> {
    pub created: Vec<&'a ApiPackage>,
    pub updated: Vec<(&'a ApiPackage, &'a Service)>,
    pub deleted: Vec<&'a Service>,
}

/// Split desired packages against the services of an existing record
#[must_use]
pub fn diff_packages<'a>(desired: &'a [ApiPackage], existing: &'a [Service]) -> PackageDiff<'a> {
    let desired = dedup_by_key(desired, |package| package.id.as_str(), "package");
    let existing = dedup_by_key(existing, |service| service.id.as_str(), "service");

    let services_by_id: HashMap<&str, &Service> = existing
        .iter()
        .map(|service| (service.id.as_str(), *service))
        .collect();
    let package_ids: HashSet<&str> = desired.iter().map(|package| package.id.as_str()).collect();

    let mut diff = PackageDiff::default();
    for package in desired.iter().copied() {
        match services_by_id.get(package.id.as_str()) {
            Some(&service) => diff.updated.push((package, service)),
            None => diff.created.push(package),
        }
    }
    diff.deleted = existing
        .into_iter()
        .filter(|service| !package_ids.contains(service.id.as_str()))
        .collect();
    diff
}

fn dedup_by_key<'a, T, F>(items: &'a [T], key: F, what: &str) -> Vec<&'a T>
where
    F: Fn(&'a T) -> &'a str,
{
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| {
            let key = key(*item);
            let first = seen.insert(key);
            if !first {
                warn!("Ignoring duplicate {} '{}'", what, key);
            }
            first
        })
        .collect()
}
