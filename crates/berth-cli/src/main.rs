//! berth - self-repairing site deployment CLI
//!
//! The `berth` command deploys a directory of generated site files to a
//! hosting provider, asking a completion model to patch the files when
//! an attempt fails.
//!
//! ## Commands
//!
//! - `deploy`: Deploy a directory with bounded automatic repair
//! - `sites`: List sites known to the hosting provider

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{warn, Level};

use berth_core::fakes::{ScriptedHostingProvider, ScriptedModel};
use berth_core::{
    CompletionModel, DeployConfig, DeploymentResult, FileSet, HostingProvider, Orchestrator,
    OrchestratorPolicy, SiteFile, METRICS,
};
use berth_providers::{GeminiModel, NetlifyProvider};

#[derive(Parser)]
#[command(name = "berth")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Self-repairing site deployment", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted output and log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a directory of site files, repairing build errors automatically
    Deploy {
        /// Directory containing the site files
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Project name (sanitized into the site name)
        #[arg(short, long)]
        name: String,

        /// Build command to run on the provider
        #[arg(long)]
        build_command: Option<String>,

        /// Directory published after the build
        #[arg(long)]
        publish_dir: Option<String>,

        /// Environment variables for the build, as KEY=VALUE
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Maximum deployment attempts before giving up
        #[arg(long, default_value = "3")]
        max_attempts: u32,

        /// Run against in-memory fakes instead of real services
        #[arg(long)]
        offline: bool,
    },

    /// List sites known to the hosting provider
    Sites,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    berth_core::init_tracing(cli.json, level);

    let outcome = match cli.command {
        Commands::Deploy {
            dir,
            name,
            build_command,
            publish_dir,
            env,
            max_attempts,
            offline,
        } => {
            cmd_deploy(
                &dir,
                &name,
                build_command,
                publish_dir,
                &env,
                max_attempts,
                offline,
                cli.json,
            )
            .await
        }
        Commands::Sites => cmd_sites(cli.json).await,
    };

    if cli.verbose {
        METRICS.flush();
    }

    outcome
}

#[allow(clippy::too_many_arguments)]
async fn cmd_deploy(
    dir: &Path,
    name: &str,
    build_command: Option<String>,
    publish_dir: Option<String>,
    env: &[String],
    max_attempts: u32,
    offline: bool,
    json: bool,
) -> Result<()> {
    let files = read_site_dir(dir)
        .with_context(|| format!("Failed to read site directory {}", dir.display()))?;

    let config = DeployConfig {
        project_name: name.to_string(),
        build_command,
        publish_directory: publish_dir,
        environment: parse_env_pairs(env)?,
    };

    let (provider, model): (Arc<dyn HostingProvider>, Arc<dyn CompletionModel>) = if offline {
        (
            Arc::new(ScriptedHostingProvider::new()),
            Arc::new(ScriptedModel::unavailable()),
        )
    } else {
        let provider = NetlifyProvider::from_env();
        if !provider.is_configured() {
            bail!("NETLIFY_AUTH_TOKEN is not set (use --offline to validate without deploying)");
        }
        (Arc::new(provider), Arc::new(GeminiModel::from_env()))
    };

    let orchestrator =
        Orchestrator::with_policy(provider, model, OrchestratorPolicy { max_attempts });
    let result = orchestrator.deploy_with_repair(files, &config).await;

    render_result(&result, json)?;
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_sites(json: bool) -> Result<()> {
    let provider = NetlifyProvider::from_env();
    if !provider.is_configured() {
        bail!("NETLIFY_AUTH_TOKEN is not set");
    }

    let sites = provider
        .list_projects()
        .await
        .context("Failed to list sites")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sites)?);
    } else if sites.is_empty() {
        println!("No sites found");
    } else {
        for site in sites {
            println!("{}  {}  {}", site.id, site.name, site.url);
        }
    }
    Ok(())
}

fn render_result(result: &DeploymentResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.success {
        println!(
            "Deployed after {} attempt(s)",
            result.attempt_history.len()
        );
        if let Some(url) = &result.deploy_url {
            println!("  site:  {}", url);
        }
        if let Some(url) = &result.admin_url {
            println!("  admin: {}", url);
        }
    } else {
        println!(
            "Deployment failed after {} attempt(s)",
            result.attempt_history.len()
        );
        if let Some(message) = &result.error_message {
            println!("  error: {}", message);
        }
        println!("  suggestions:");
        for suggestion in &result.suggestions {
            println!("    - {}", suggestion);
        }
    }
    Ok(())
}

/// Parse `KEY=VALUE` pairs from the command line.
fn parse_env_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Invalid env entry '{}': expected KEY=VALUE", pair))?;
        env.insert(key.to_string(), value.to_string());
    }
    Ok(env)
}

/// Read a directory tree into a deployable file set.
///
/// Skips version-control and dependency directories, dotfiles, and
/// files that are not valid UTF-8 (file contents are opaque text
/// payloads keyed by path).
fn read_site_dir(dir: &Path) -> Result<FileSet> {
    let mut files = Vec::new();
    collect_files(dir, dir, &mut files)?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(FileSet::from_files(files))
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<SiteFile>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if name.starts_with('.') || name == "node_modules" {
            continue;
        }

        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .expect("entry path is under the walk root");
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            match std::fs::read_to_string(&path) {
                Ok(content) => out.push(SiteFile::new(relative, content)),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable file");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_pairs_accepts_key_value() {
        let env = parse_env_pairs(&[
            "NODE_ENV=production".to_string(),
            "API_URL=https://x.example.com?a=b".to_string(),
        ])
        .unwrap();
        assert_eq!(env["NODE_ENV"], "production");
        // only the first '=' splits
        assert_eq!(env["API_URL"], "https://x.example.com?a=b");
    }

    #[test]
    fn test_parse_env_pairs_rejects_missing_equals() {
        let err = parse_env_pairs(&["BROKEN".to_string()]).unwrap_err();
        assert!(err.to_string().contains("BROKEN"));
    }

    #[test]
    fn test_read_site_dir_skips_vendored_and_hidden() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("index.html"), "<h1>Hi</h1>").unwrap();
        std::fs::create_dir(tmp.path().join("css")).unwrap();
        std::fs::write(tmp.path().join("css/site.css"), "body {}").unwrap();
        std::fs::create_dir(tmp.path().join("node_modules")).unwrap();
        std::fs::write(tmp.path().join("node_modules/x.js"), "x").unwrap();
        std::fs::write(tmp.path().join(".env"), "SECRET=1").unwrap();

        let files = read_site_dir(tmp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains("index.html"));
        assert!(files.contains("css/site.css"));
        assert!(!files.contains("node_modules/x.js"));
        assert!(!files.contains(".env"));
    }
}
