pub mod deploy;

pub use deploy::{DeployCommand, DeployOptions};
