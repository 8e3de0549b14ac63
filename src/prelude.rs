//! Common imports for embedding the reconciler.

pub use crate::controller::converter::{Converter, DefaultConverter};
pub use crate::controller::reconciler::{
    ApplicationResult, CompensationHook, FailedApplication, Operation, PassSummary, Reconciler,
    ReconcilerError, SideEffect, SyncError,
};
pub use crate::crd::RuntimeApplication;
pub use crate::model::{
    ApiPackage, Application, Auth, Credentials, DesiredState, RequestParameters,
};
pub use crate::provider::{
    ApplicationRepository, Asset, AssetPublisher, CredentialsStore, ListFilter,
    RequestParametersStore, StoreError,
};
