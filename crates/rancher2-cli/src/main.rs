//! Rancher2 CLI - drive the provider from the command line.
//!
//! This is the entry point for the `rancher2` binary. Results are printed
//! to stdout as JSON; logs go to stderr.

mod commands;

use clap::{Parser, Subcommand};
use rancher2_provider::{Provider, ProviderConfig};
use tracing_subscriber::EnvFilter;

/// Rancher2 CLI - manage Rancher resources declaratively.
#[derive(Parser, Debug)]
#[command(name = "rancher2")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the Rancher server.
    #[arg(long, env = "RANCHER_URL", global = true)]
    api_url: Option<String>,

    /// API access key.
    #[arg(long, env = "RANCHER_ACCESS_KEY", global = true)]
    access_key: Option<String>,

    /// API secret key.
    #[arg(long, env = "RANCHER_SECRET_KEY", global = true, hide_env_values = true)]
    secret_key: Option<String>,

    /// Combined `<access-key>:<secret-key>` token.
    #[arg(long, env = "RANCHER_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// PEM-encoded CA certificate.
    #[arg(long, env = "RANCHER_CA_CERTS", global = true)]
    cacert: Option<String>,

    /// Server to select from the Rancher CLI configuration file.
    #[arg(long, env = "RANCHER_CURRENT_SERVER", global = true)]
    current_server: Option<String>,

    /// Enable debug logging.
    #[arg(long, default_value = "false", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_url: self.api_url.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            token: self.token.clone(),
            cacert: self.cacert.clone(),
            current_server: self.current_server.clone(),
        }
    }
}

/// Declared configuration or tracked state: inline JSON or `@path`.
type Document = String;

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a resource from declared configuration.
    Create {
        /// Resource kind, e.g. `cluster` or `rancher2_cluster`.
        kind: String,
        /// Declared configuration.
        #[arg(long)]
        config: Document,
    },
    /// Refresh tracked state from the remote.
    Read {
        /// Resource kind.
        kind: String,
        /// Resource ID.
        id: String,
        /// Previously tracked state.
        #[arg(long)]
        state: Option<Document>,
    },
    /// Apply declared configuration to an existing resource.
    Update {
        /// Resource kind.
        kind: String,
        /// Resource ID.
        id: String,
        /// Declared configuration.
        #[arg(long)]
        config: Document,
        /// Previously tracked state; read from the remote when omitted.
        #[arg(long)]
        state: Option<Document>,
    },
    /// Delete a resource.
    Delete {
        /// Resource kind.
        kind: String,
        /// Resource ID.
        id: String,
    },
    /// Check whether a resource exists.
    Exists {
        /// Resource kind.
        kind: String,
        /// Resource ID.
        id: String,
    },
    /// Adopt an existing resource.
    Import {
        /// Resource kind.
        kind: String,
        /// Resource ID.
        id: String,
    },
    /// Show what applying declared configuration would do.
    Plan {
        /// Resource kind.
        kind: String,
        /// Resource ID.
        id: String,
        /// Declared configuration.
        #[arg(long)]
        config: Document,
        /// Previously tracked state; read from the remote when omitted.
        #[arg(long)]
        state: Option<Document>,
    },
    /// Run a read-only lookup.
    #[command(subcommand)]
    Lookup(Lookup),
    /// Print the provider schema.
    Schema,
}

#[derive(Subcommand, Debug)]
enum Lookup {
    /// The user the credentials belong to.
    CallerIdentity,
    /// A project by name within a cluster.
    Project {
        /// Owning cluster.
        #[arg(long)]
        cluster_id: String,
        /// Project name.
        #[arg(long)]
        name: String,
    },
    /// A token of a user.
    Token {
        /// Owning user.
        #[arg(long)]
        user_id: String,
        /// Match only expired (`true`) or unexpired (`false`) tokens.
        #[arg(long)]
        expired: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("rancher2_provider=debug,rancher2_client=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if matches!(args.command, Command::Schema) {
        return commands::print(&Provider::describe());
    }

    let provider = Provider::connect(&args.provider_config())?;
    commands::run(&provider, args.command).await
}
