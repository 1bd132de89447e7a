//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of every kind this controller owns as
//! multi-document YAML.
//!
//! ## Usage
//!
//! ```bash
//! # All CRDs
//! cargo run --bin crdgen > config/crd/edge.octopilot.io.yaml
//!
//! # A single kind, applied directly
//! cargo run --bin crdgen -- --kind Pool | kubectl apply -f -
//! ```

use clap::Parser;
use edge_provider_controller::crd::{LoadBalancer, Monitor, Pool, ProviderConfig, WorkerScript};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::core::CustomResourceExt;

#[derive(Parser, Debug)]
#[command(name = "crdgen", about = "Generate CRD YAML for the edge provider controller")]
struct Cli {
    /// Only print the CRD of this kind (e.g. Pool)
    #[arg(long)]
    kind: Option<String>,
}

fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![
        ProviderConfig::crd(),
        Monitor::crd(),
        Pool::crd(),
        LoadBalancer::crd(),
        WorkerScript::crd(),
    ]
}

fn main() {
    let cli = Cli::parse();

    let crds: Vec<CustomResourceDefinition> = all_crds()
        .into_iter()
        .filter(|crd| {
            cli.kind
                .as_deref()
                .is_none_or(|kind| crd.spec.names.kind.eq_ignore_ascii_case(kind))
        })
        .collect();

    if crds.is_empty() {
        eprintln!("No CRD matches kind {:?}", cli.kind.unwrap_or_default());
        std::process::exit(1);
    }

    for crd in crds {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => {
                print!("---\n{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {}", e);
                std::process::exit(1);
            }
        }
    }
}
