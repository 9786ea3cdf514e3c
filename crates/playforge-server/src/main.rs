//! Playforge - build educational mini-games from templates and collect results

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use playforge_core::config::{Config, LOCAL_CONFIG_FILE};
use playforge_core::projects::ProjectRepository;
use playforge_core::results::{ResultFilter, ResultsLog};
use playforge_core::storage::Database;
use playforge_server::AppState;
use serde_json::json;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "playforge")]
#[command(author, version, about = "Template-based educational mini-game builder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a config file (overrides PLAYFORGE_CONFIG and ./playforge.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        /// Address to listen on (defaults to server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Browse game templates
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Browse submitted game results
    Results {
        #[command(subcommand)]
        action: ResultAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List all projects
    List,
    /// Create a project from a template
    Create {
        /// Display name of the project
        name: String,
        /// Template id
        #[arg(short, long)]
        template: String,
    },
    /// Copy a project under a new name
    Duplicate { name: String },
    /// Delete a project
    Delete { name: String },
    /// Export a project as a zip archive
    Export {
        name: String,
        /// Output file (defaults to <project>.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// List available templates
    List,
}

#[derive(Subcommand)]
enum ResultAction {
    /// List results, newest first
    List {
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("playforge=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(e) = &result {
        if let Some(hint) = suggestion_for(e) {
            eprintln!("Hint: {}", hint);
        }
    }
    result
}

/// Suggestion attached to the first playforge error in the chain
fn suggestion_for(error: &anyhow::Error) -> Option<String> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<playforge_core::Error>())
        .and_then(playforge_core::Error::suggestion)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    if let Commands::Config {
        action: ConfigAction::Init { force },
    } = &cli.command
    {
        return cmd_config_init(cli.config.as_deref(), *force, out);
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => cmd_serve(config, bind).await,
        Commands::Projects { action } => cmd_projects(&config, action, out),
        Commands::Templates { action } => cmd_templates(&config, action, out),
        Commands::Results { action } => cmd_results(&config, action, out).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&config, out),
            ConfigAction::Init { .. } => Ok(()),
        },
    }
}

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn print_json(&self, value: &serde_json::Value) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Confirmation line for mutating commands
    fn done(&self, value: serde_json::Value, message: &str) -> anyhow::Result<()> {
        if self.json() {
            self.print_json(&value)
        } else {
            if !self.quiet {
                println!("{}", message);
            }
            Ok(())
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_serve(mut config: Config, bind: Option<String>) -> anyhow::Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    let addr = config.server.bind.clone();

    if config.mail.is_configured() {
        info!(sender = ?config.mail.sender_email, "Result emails enabled");
    } else {
        warn!("Mail is not configured; result submissions will be saved but not emailed");
    }

    let state = AppState::from_config(config).await?;
    let app = playforge_server::app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Playforge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn cmd_projects(config: &Config, action: ProjectAction, out: Output) -> anyhow::Result<()> {
    let repo = ProjectRepository::new(&config.storage);
    match action {
        ProjectAction::List => {
            let projects = repo.list()?;
            if out.json() {
                return out.print_json(&serde_json::to_value(&projects)?);
            }
            if projects.is_empty() {
                if !out.quiet {
                    println!("No projects found.");
                    println!("\nCreate one with: playforge projects create <name> --template <id>");
                }
                return Ok(());
            }
            if !out.quiet {
                println!("Projects:");
            }
            for p in projects {
                match p.template_id {
                    Some(template) => println!("  {} - {} ({})", p.id, p.name, template),
                    None => println!("  {} - {}", p.id, p.name),
                }
            }
        }
        ProjectAction::Create { name, template } => {
            let id = repo.create(&name, &template)?;
            out.done(
                json!({"status": "success", "project_id": id}),
                &format!("Project '{}' created as {}.", name.trim(), id),
            )?;
        }
        ProjectAction::Duplicate { name } => {
            let id = repo.duplicate(&name)?;
            out.done(
                json!({"status": "success", "project_id": id}),
                &format!("Project duplicated as {}.", id),
            )?;
        }
        ProjectAction::Delete { name } => {
            let id = repo.delete(&name)?;
            out.done(
                json!({"status": "success", "project_id": id}),
                &format!("Project '{}' deleted.", id),
            )?;
        }
        ProjectAction::Export { name, output } => {
            let archive = repo.export(&name)?;
            let path = output.unwrap_or_else(|| PathBuf::from(format!("{}.zip", name)));
            std::fs::write(&path, &archive)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            out.done(
                json!({"status": "success", "path": path.display().to_string(), "bytes": archive.len()}),
                &format!("Exported {} ({} bytes) to {}.", name, archive.len(), path.display()),
            )?;
        }
    }
    Ok(())
}

fn cmd_templates(config: &Config, action: TemplateAction, out: Output) -> anyhow::Result<()> {
    let repo = ProjectRepository::new(&config.storage);
    match action {
        TemplateAction::List => {
            let templates = repo.templates().list()?;
            if out.json() {
                return out.print_json(&serde_json::to_value(&templates)?);
            }
            if templates.is_empty() {
                if !out.quiet {
                    println!(
                        "No templates found in {}.",
                        config.storage.templates_dir.display()
                    );
                }
                return Ok(());
            }
            for t in templates {
                println!("  {} - {}: {}", t.id, t.name, t.description);
            }
        }
    }
    Ok(())
}

async fn cmd_results(config: &Config, action: ResultAction, out: Output) -> anyhow::Result<()> {
    match action {
        ResultAction::List {
            student,
            project,
            email,
            page,
        } => {
            let db = Database::open(&config.storage.database_path).await?;
            let results = ResultsLog::new(db);
            let filter = ResultFilter::new(student, project, email);
            let page = results
                .query(&filter, page, config.server.results_per_page)
                .await?;

            if out.json() {
                return out.print_json(&json!({
                    "items": page.items,
                    "total": page.total,
                    "page": page.page,
                    "total_pages": page.total_pages(),
                }));
            }
            if page.items.is_empty() {
                if !out.quiet {
                    println!("No results found.");
                }
                return Ok(());
            }
            for r in &page.items {
                println!(
                    "  {}  {} <{}>  {}  score: {}  time: {}",
                    r.created_at.format("%Y-%m-%d %H:%M"),
                    r.student_name,
                    r.student_email,
                    r.project_name,
                    r.score,
                    r.time_spent
                );
            }
            if !out.quiet {
                println!(
                    "\nPage {} of {} ({} results)",
                    page.page,
                    page.total_pages(),
                    page.total
                );
            }
        }
    }
    Ok(())
}

fn cmd_config_show(config: &Config, out: Output) -> anyhow::Result<()> {
    let items = config.list()?;
    if out.json() {
        let map: serde_json::Map<String, serde_json::Value> = items
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::from(v)))
            .collect();
        return out.print_json(&serde_json::Value::Object(map));
    }
    for (key, value) in items {
        println!("{} = {}", key, value);
    }
    Ok(())
}

fn cmd_config_init(explicit: Option<&Path>, force: bool, out: Output) -> anyhow::Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
    if path.exists() && !force {
        return Err(anyhow!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        ));
    }
    Config::default().save(&path)?;
    out.done(
        json!({"status": "success", "path": path.display().to_string()}),
        &format!("Wrote default configuration to {}.", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_results_list_arguments() {
        let cli = Cli::try_parse_from([
            "playforge",
            "--format",
            "json",
            "results",
            "list",
            "--student",
            "Anna",
            "--page",
            "2",
        ])
        .unwrap();
        assert!(cli.format == OutputFormat::Json);
        match cli.command {
            Commands::Results {
                action:
                    ResultAction::List {
                        student, page, project, ..
                    },
            } => {
                assert_eq!(student.as_deref(), Some("Anna"));
                assert_eq!(project, None);
                assert_eq!(page, 2);
            }
            _ => panic!("expected results list"),
        }
    }

    #[test]
    fn test_suggestion_found_through_context() {
        let err = anyhow::Error::from(playforge_core::Error::TemplateNotFound("maze".into()))
            .context("Failed to create project");
        assert_eq!(
            suggestion_for(&err).as_deref(),
            Some("playforge templates list")
        );
        assert_eq!(suggestion_for(&anyhow!("plain failure")), None);
    }

    #[test]
    fn test_create_requires_template() {
        assert!(Cli::try_parse_from(["playforge", "projects", "create", "Quiz"]).is_err());
    }
}
