// Streaming services

pub mod diagnostics;
pub mod orchestrator;
pub mod svtplay;
pub mod traits;
pub mod viafree;

pub use orchestrator::ServiceRegistry;
pub use svtplay::Svtplay;
pub use traits::{Resolution, ResolvedItem, Service, ServiceContext};
pub use viafree::Viafree;
