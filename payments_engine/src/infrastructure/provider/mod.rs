pub mod factory;
pub mod sandbox_provider;

pub use factory::ProviderRegistry;
pub use sandbox_provider::SandboxProvider;
