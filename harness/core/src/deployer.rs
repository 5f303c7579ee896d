use async_trait::async_trait;

use crate::{
    deployment::{DeployError, Deployment},
    params::DeploymentParameters,
};

/// One deployment strategy per server variant. Implementations resolve what
/// to launch, pass the environment name through, bind the requested base
/// URL, and only return once readiness is observed. The launched target is
/// registered on the returned handle before the readiness wait, so failed
/// startups are still torn down.
#[async_trait]
pub trait ApplicationDeployer: Send + Sync {
    async fn deploy(&self, params: &DeploymentParameters) -> Result<Deployment, DeployError>;
}
