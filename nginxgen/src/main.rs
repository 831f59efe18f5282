//! nginxgen - nginx configuration from deployment descriptors
//!
//! This is the main entry point for the nginxgen CLI.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use nginxgen_config::{render_site, render_sites};
use nginxgen_core::config::ConfigLoader;
use nginxgen_core::deploy::Deployer;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt};

/// nginxgen - render and deploy nginx site configuration
#[derive(Parser)]
#[command(name = "nginxgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the configuration to stdout
    Render {
        /// Path to the deployment descriptor (.toml or .json)
        #[arg(default_value = "deploy.toml")]
        config: PathBuf,

        /// Render only this site
        #[arg(long)]
        site: Option<String>,
    },

    /// Validate a deployment descriptor
    Validate {
        /// Path to the deployment descriptor (.toml or .json)
        #[arg(default_value = "deploy.toml")]
        config: PathBuf,
    },

    /// Install the rendered configuration and reload nginx
    Deploy {
        /// Path to the deployment descriptor (.toml or .json)
        #[arg(default_value = "deploy.toml")]
        config: PathBuf,

        /// Install path (overrides the descriptor)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Do not run the reload command
        #[arg(long)]
        no_reload: bool,
    },

    /// Show version information
    Version,
}

impl Commands {
    fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Commands::Render { config, .. }
            | Commands::Validate { config }
            | Commands::Deploy { config, .. } => Some(config),
            Commands::Version => None,
        }
    }
}

/// Handle to swap in the descriptor's log level once it is loaded
type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install logging before anything else runs.
///
/// Returns a handle when neither `--verbose` nor `RUST_LOG` decided the
/// level, so the descriptor's `logging.level` can still apply.
fn init_tracing(verbose: bool) -> Option<FilterHandle> {
    let (filter, from_descriptor) = if verbose {
        (EnvFilter::new("debug"), false)
    } else {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => (filter, false),
            Err(_) => (EnvFilter::new("info"), true),
        }
    };
    let (filter, handle) = reload::Layer::new(filter);

    // Logs go to stderr so rendered output on stdout stays clean
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    from_descriptor.then_some(handle)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(path) = cli.command.config_path() else {
        println!("nginxgen v{}", nginxgen_core::VERSION);
        return Ok(());
    };

    let filter = init_tracing(cli.verbose);
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let config = ConfigLoader::load(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    if let Some(filter) = filter {
        filter
            .reload(EnvFilter::new(&config.logging.level))
            .context("Failed to apply logging.level")?;
    }

    match cli.command {
        Commands::Render { site, .. } => {
            let rendered = match site {
                Some(name) => {
                    let Some(site) = config.sites.get(&name) else {
                        bail!("Unknown site '{}'", name);
                    };
                    render_site(&name, site, |_| Ok(()))?
                }
                None => render_sites(&config, |_, _| Ok(()))?,
            };
            print!("{}", rendered);
        }

        Commands::Validate { config: path } => {
            tracing::info!("Validating config: {}", path.display());
            render_sites(&config, |_, _| Ok(()))?;
            println!("✅ Configuration '{}' is valid! ({} site(s))", path.display(), config.sites.len());
        }

        Commands::Deploy { output, no_reload, .. } => {
            let Some(output) = output.or_else(|| config.output_path()) else {
                bail!("No install path: pass --output or configure reload.output");
            };

            let rendered = render_sites(&config, |_, _| Ok(()))?;
            let reload = (!no_reload).then(|| config.reload.command.clone());
            let deployer = Deployer::new(output, reload);

            tracing::info!("🚀 Deploying {} site(s) to {}", config.sites.len(), deployer.output().display());
            deployer.deploy(&rendered)?;
            println!("✅ Deployed to {}", deployer.output().display());
        }

        Commands::Version => unreachable!("handled before loading the descriptor"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_deploy_flags() {
        let cli = Cli::try_parse_from(["nginxgen", "deploy", "site.toml", "--output", "/tmp/nginx.conf", "--no-reload"]).unwrap();
        match cli.command {
            Commands::Deploy { config, output, no_reload } => {
                assert_eq!(config, PathBuf::from("site.toml"));
                assert_eq!(output, Some(PathBuf::from("/tmp/nginx.conf")));
                assert!(no_reload);
            }
            _ => panic!("expected deploy"),
        }
    }
}
