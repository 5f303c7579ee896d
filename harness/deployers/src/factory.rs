use server_comparison_core::{ApplicationDeployer, ServerVariant};

use crate::{InProcessDeployer, ReverseProxyDeployer, SelfHostDeployer};

/// Deployer for the requested server variant. One strategy per variant;
/// callers never branch on the variant themselves.
#[must_use]
pub fn deployer_for(variant: ServerVariant) -> Box<dyn ApplicationDeployer> {
    match variant {
        ServerVariant::SelfHost => Box::new(SelfHostDeployer::new()),
        ServerVariant::InProcess => Box::new(InProcessDeployer::new()),
        ServerVariant::ReverseProxy => Box::new(ReverseProxyDeployer::new()),
    }
}
