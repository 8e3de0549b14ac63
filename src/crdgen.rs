//! # CRD Generator
//!
//! Prints the `Application` CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/application.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use application_sync_controller::crd::Application;
use kube::core::CustomResourceExt;

fn main() {
    match serde_yaml::to_string(&Application::crd()) {
        Ok(yaml) => print!("{yaml}"),
        Err(e) => {
            eprintln!("Failed to serialize CRD to YAML: {e}");
            std::process::exit(1);
        }
    }
}
