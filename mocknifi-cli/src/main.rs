//! mocknifi CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mocknifi_keystore::KeyStore;
use mocknifi_runtime::{ServerBuilder, SignalHandler};
use mocknifi_tls::{write_pem_files, ServerCredentials, TlsAcceptor, TlsSettings};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mocknifi")]
#[command(about = "Mutual-TLS test double for collection submissions", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve POST /collection over mutual TLS
    Serve {
        #[command(flatten)]
        tls: TlsArgs,

        /// Address to listen on
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:5000")]
        listen: SocketAddr,

        /// Seconds to wait for in-flight connections on shutdown
        #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
        shutdown_timeout: u64,
    },

    /// Load both stores and build the TLS context without listening
    Validate {
        #[command(flatten)]
        tls: TlsArgs,
    },

    /// Write the encoded key+chain and certificate as PEM files
    Export {
        #[command(flatten)]
        tls: TlsArgs,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
    },

    /// List the entries of a keystore
    Inspect {
        /// Keystore file
        path: PathBuf,

        /// Keystore integrity password
        #[arg(long, default_value = "", hide_default_value = true)]
        password: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args, Debug)]
struct TlsArgs {
    /// Keystore holding the server key
    #[arg(long, env = "KEYSTORE_PATH", default_value = mocknifi_tls::config::DEFAULT_KEYSTORE_PATH)]
    keystore: PathBuf,

    /// Truststore holding the presented and trusted certificates
    #[arg(long, env = "TRUSTSTORE_PATH", default_value = mocknifi_tls::config::DEFAULT_TRUSTSTORE_PATH)]
    truststore: PathBuf,

    /// Keystore integrity password
    #[arg(long, env = "KEYSTORE_PASSWORD", default_value = "", hide_env_values = true)]
    keystore_password: String,

    /// Truststore integrity password
    #[arg(long, env = "TRUSTSTORE_PASSWORD", default_value = "", hide_env_values = true)]
    truststore_password: String,

    /// Key entry password, keystore password when empty
    #[arg(long, env = "TLS_KEY_PASSWORD", default_value = "", hide_env_values = true)]
    key_password: String,

    /// Alias of the private key entry
    #[arg(long, env = "TLS_KEY_ID", default_value = mocknifi_tls::config::DEFAULT_ALIAS)]
    key_id: String,

    /// Alias of the trusted certificate entry
    #[arg(long, env = "TLS_CERT_ID", default_value = mocknifi_tls::config::DEFAULT_ALIAS)]
    cert_id: String,

    /// Minimum TLS version
    #[arg(
        long,
        env = "TLS_MIN_VERSION",
        default_value = mocknifi_tls::config::DEFAULT_MIN_TLS_VERSION,
        value_parser = ["1.2", "1.3"]
    )]
    min_tls_version: String,

    /// Also accept clients chaining to the platform trust roots
    #[arg(long, env = "TLS_TRUST_SYSTEM_ROOTS")]
    trust_system_roots: bool,

    /// Directory to write the encoded PEM files to on startup
    #[arg(long, env = "PEM_EXPORT_DIR")]
    pem_export_dir: Option<PathBuf>,
}

impl From<TlsArgs> for TlsSettings {
    fn from(args: TlsArgs) -> Self {
        TlsSettings {
            keystore_path: args.keystore,
            keystore_password: args.keystore_password,
            truststore_path: args.truststore,
            truststore_password: args.truststore_password,
            key_password: args.key_password,
            key_alias: args.key_id,
            cert_alias: args.cert_id,
            min_tls_version: args.min_tls_version,
            trust_system_roots: args.trust_system_roots,
            pem_export_dir: args.pem_export_dir,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("mocknifi");
        println!("Version: {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
        return Ok(());
    }

    init_tracing(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Serve {
            tls,
            listen,
            shutdown_timeout,
        } => serve(tls.into(), listen, Duration::from_secs(shutdown_timeout)).await,

        Commands::Validate { tls } => {
            let mut settings: TlsSettings = tls.into();
            settings.pem_export_dir = None;

            match build_acceptor(&settings) {
                Ok(_) => {
                    tracing::info!("✓ Keystores and TLS context are valid");
                    tracing::info!("  Keystore: {}", settings.keystore_path.display());
                    tracing::info!("  Truststore: {}", settings.truststore_path.display());
                    tracing::info!("  Key alias: {}", settings.key_alias);
                    tracing::info!("  Certificate alias: {}", settings.cert_alias);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Export { tls, out } => {
            let settings: TlsSettings = tls.into();
            settings.validate()?;

            let credentials = ServerCredentials::load(&settings).with_context(|| {
                format!(
                    "Failed to load credentials from {}",
                    settings.keystore_path.display()
                )
            })?;
            let files = write_pem_files(&out, &credentials)
                .with_context(|| format!("Failed to export PEM files to {}", out.display()))?;

            println!("{}", files.key_file.display());
            if let Some(cert_file) = files.cert_file {
                println!("{}", cert_file.display());
            }
            Ok(())
        }

        Commands::Inspect {
            path,
            password,
            json,
        } => {
            let store = KeyStore::load(&path, &password)
                .with_context(|| format!("Failed to open keystore {}", path.display()))?;
            let entries: Vec<_> = store.entries().collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("{:<24} {:<20} {:<26} CHAIN", "ALIAS", "KIND", "CREATED");
                for entry in &entries {
                    println!(
                        "{:<24} {:<20} {:<26} {}",
                        entry.alias,
                        entry.kind.to_string(),
                        entry.created.to_rfc3339(),
                        entry.certificates
                    );
                }
            }
            Ok(())
        }

        Commands::Version => Ok(()),
    }
}

async fn serve(settings: TlsSettings, listen: SocketAddr, shutdown_timeout: Duration) -> Result<()> {
    tracing::info!("Starting mocknifi");
    tracing::info!(
        keystore = %settings.keystore_path.display(),
        truststore = %settings.truststore_path.display(),
        key_alias = %settings.key_alias,
        cert_alias = %settings.cert_alias,
        "TLS settings loaded"
    );

    let acceptor = build_acceptor(&settings)?;

    let server = ServerBuilder::new()
        .listen(listen)
        .tls(acceptor)
        .shutdown_timeout(shutdown_timeout)
        .build()?;

    let shutdown_signal = server.shutdown_signal();
    tokio::spawn(async move {
        let handler = SignalHandler::new(shutdown_signal);
        handler.run().await;
    });

    server.run().await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Build the mutual-TLS acceptor, refusing to start on keystore or TLS errors
fn build_acceptor(settings: &TlsSettings) -> Result<TlsAcceptor> {
    TlsAcceptor::new(settings).map_err(|e| {
        if e.is_fatal_at_startup() {
            tracing::error!(
                keystore = %settings.keystore_path.display(),
                truststore = %settings.truststore_path.display(),
                error = %e,
                "TLS bootstrap failed, refusing to start"
            );
        }
        anyhow::Error::new(e).context(format!(
            "Failed to bootstrap TLS from {} and {}",
            settings.keystore_path.display(),
            settings.truststore_path.display()
        ))
    })
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(filter.into())
            .add_directive("rustls=warn".parse()?),
    );

    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};
    use std::path::Path;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    /// Parse without consulting the environment, so ambient variables cannot leak in
    fn parse_without_env(args: &[&str]) -> Cli {
        let no_env = |arg: clap::Arg| arg.env(None::<&str>);
        let matches = Cli::command()
            .mut_args(no_env)
            .mut_subcommand("serve", |serve| serve.mut_args(no_env))
            .try_get_matches_from(args)
            .unwrap();
        Cli::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn test_serve_defaults() {
        let cli = parse_without_env(&["mocknifi", "serve"]);
        let Commands::Serve {
            tls,
            listen,
            shutdown_timeout,
        } = cli.command
        else {
            panic!("expected serve");
        };

        assert_eq!(listen, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(shutdown_timeout, 10);

        let settings: TlsSettings = tls.into();
        assert_eq!(settings, TlsSettings::default());
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "mocknifi",
            "serve",
            "--keystore",
            "/tmp/ks.jks",
            "--key-id",
            "server",
            "--cert-id",
            "presented",
            "--min-tls-version",
            "1.3",
            "--trust-system-roots",
        ])
        .unwrap();
        let Commands::Serve { tls, .. } = cli.command else {
            panic!("expected serve");
        };

        let settings: TlsSettings = tls.into();
        assert_eq!(settings.keystore_path, PathBuf::from("/tmp/ks.jks"));
        assert_eq!(settings.key_alias, "server");
        assert_eq!(settings.cert_alias, "presented");
        assert_eq!(settings.min_tls_version, "1.3");
        assert!(settings.trust_system_roots);
    }

    #[test]
    fn test_rejects_unknown_tls_version() {
        assert!(Cli::try_parse_from(["mocknifi", "serve", "--min-tls-version", "1.1"]).is_err());
    }

    #[test]
    fn test_build_acceptor_rejects_missing_keystore() {
        let settings = TlsSettings {
            keystore_path: PathBuf::from("/nonexistent/keystore.jks"),
            ..TlsSettings::default()
        };

        let err = build_acceptor(&settings).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/keystore.jks"), "{err:#}");

        let cause = err.downcast_ref::<mocknifi_core::Error>().unwrap();
        assert!(matches!(cause, mocknifi_core::Error::Config(_)));
        assert!(cause.is_fatal_at_startup());
    }

    #[test]
    fn test_build_acceptor_from_fixtures() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests/fixtures");
        let settings = TlsSettings {
            keystore_path: fixtures.join("keystore.jks"),
            keystore_password: "changeit".to_string(),
            truststore_path: fixtures.join("truststore.jks"),
            truststore_password: "trustpass".to_string(),
            ..TlsSettings::default()
        };
        assert!(build_acceptor(&settings).is_ok());
    }

    #[test]
    fn test_export_requires_out() {
        assert!(Cli::try_parse_from(["mocknifi", "export"]).is_err());
        assert!(Cli::try_parse_from(["mocknifi", "export", "--out", "/tmp/pem"]).is_ok());
    }
}
