//! Video generation providers.

mod veo;

pub use veo::{VeoModel, VeoProvider, VeoProviderBuilder};
