//! Prints the Ilb CustomResourceDefinition as YAML.
//!
//! `cargo run -p crds --bin crdgen > config/crd/ilb.yaml`

use anyhow::Result;
use crds::Ilb;
use kube::CustomResourceExt;

fn main() -> Result<()> {
    let crd = Ilb::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
