pub mod config;
pub use config::{Options, ResolvedOptions};

pub mod error;
pub use error::{Error, Result};

pub mod host;
pub use host::{Site, TransformHost};

pub mod output;
pub use output::OutputFormat;

pub mod plugin;
pub use plugin::{register, MathPlugin};

pub mod tex;

pub mod util;

mod document;
mod lite;
