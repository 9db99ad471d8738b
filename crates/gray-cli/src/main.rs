use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gray")]
#[command(about = "Graylist admission CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (defaults -> site -> overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Replay events through admission and print one JSON result per event
    Admit {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// JSON array of graylist rules, in precedence order
        #[arg(long)]
        filters: String,

        /// JSON Lines file of events ({id, environment, kind, tags})
        #[arg(long)]
        events: String,

        /// Append RULE_MATCH / IMPERSONATED / REJECTED outcomes to this audit log
        #[arg(long)]
        audit: Option<String>,

        /// Unused config keys: warn | fail
        #[arg(long = "unused-keys", default_value = "warn")]
        unused_keys: String,
    },

    /// Audit trail utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of an audit log
    Verify {
        /// Path to the JSONL audit log
        path: String,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = gray_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Admit {
            config_paths,
            filters,
            events,
            audit,
            unused_keys,
        } => {
            let policy = commands::parse_unused_key_policy(&unused_keys)?;
            let summary = commands::admit::run(commands::admit::AdmitArgs {
                config_paths: &config_paths,
                filters_path: &filters,
                events_path: &events,
                audit_path: audit.as_deref(),
                unused_keys: policy,
            })?;
            tracing::info!(
                admitted = summary.admitted,
                rejected = summary.rejected,
                audited = summary.audited,
                "admission replay complete"
            );
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => match gray_audit::verify_hash_chain(&path)? {
                gray_audit::VerifyResult::Valid { lines } => {
                    println!("audit_chain=VALID lines={lines}");
                }
                gray_audit::VerifyResult::Broken { line, reason } => {
                    println!("audit_chain=BROKEN line={line} reason={reason}");
                    anyhow::bail!("audit hash chain broken at line {line}");
                }
            },
        },
    }

    Ok(())
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
