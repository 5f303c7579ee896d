mod factory;
mod in_process;
mod reverse_proxy;
mod self_host;

pub use factory::deployer_for;
pub use in_process::InProcessDeployer;
pub use reverse_proxy::ReverseProxyDeployer;
pub use self_host::SelfHostDeployer;
