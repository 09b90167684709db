use std::{fs::File, io::Read, path::PathBuf};

use anyhow::Context;
use argh::FromArgs;
use math_transform::{register, util::PathHelper, Options, Site};
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Typesets the TeX math in an already built site, in place
struct Args {
    #[argh(option)]
    /// path to a TOML options file
    config: Option<PathBuf>,
    #[argh(option)]
    /// host version reported to the compatibility check
    host_version: Option<String>,
    #[argh(positional)]
    /// built site directory
    site_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = argh::from_env::<Args>();
    let options = match &args.config {
        Some(path) => {
            let mut f = File::open(path).with_context(|| format!("Open {}", path.display()))?;
            let mut s = String::new();
            f.read_to_string(&mut s)?;
            Options::from_toml_str(&s).context("Parse options")?
        }
        None => Options::default(),
    };

    let mut site = match &args.host_version {
        Some(v) => Site::with_version(semver::Version::parse(v).context("Parse host version")?),
        None => Site::new(),
    };
    register(&mut site, options).context("Set up math transform")?;

    let cwd = std::env::current_dir()?;
    let site_dir = args.site_dir.maybe_suffix(&cwd);
    event!(Level::INFO, r#type = "site", ?site_dir);
    let summary = site.process_dir(&site_dir)?;
    event!(
        Level::INFO,
        r#type = "done",
        visited = summary.visited,
        rewritten = summary.rewritten,
        skipped = summary.skipped
    );

    Ok(())
}
