//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition (CRD) YAML from Rust type
//! definitions, using the `kube` crate's `CustomResourceExt` trait.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/sentry.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;

use sentry_controller::crd::{ClientKey, Project, Team};

fn main() -> anyhow::Result<()> {
    let crds = [Team::crd(), Project::crd(), ClientKey::crd()];
    for crd in crds {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
