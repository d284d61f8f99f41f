mod settings;

pub use settings::{Config, VisualConfig, EXAMPLE_CONFIG};
