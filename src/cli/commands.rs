use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use super::output::{
    print_json, render_check, render_deletion, render_messages, render_projects, render_repair,
    render_sessions, render_tree,
};
use crate::config::Config;
use crate::editing::delete_from;
use crate::indexer::{
    RefreshMode, check_index, list_messages, list_projects, list_sessions, load_tree, rebuild_index,
    repair_index,
};
use crate::summary::{generate_and_merge_summary, merge_summary};
use crate::utils::{project_dir_of, session_id_from_path};

#[derive(Parser)]
#[command(name = "session-keeper")]
#[command(version)]
#[command(about = "Keep assistant transcripts and their session indexes consistent", long_about = None)]
pub struct Cli {
    /// Configuration file (default: <config dir>/session-keeper/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List projects, most recently active first
    Projects {
        #[arg(long)]
        json: bool,
    },
    /// List the sessions of a project
    Sessions {
        /// Project directory, or its encoded name under <claude dir>/projects
        #[arg(allow_hyphen_values = true)]
        project: String,
        /// Override the configured refresh policy
        #[arg(long, value_enum)]
        refresh: Option<RefreshMode>,
        #[arg(long)]
        json: bool,
    },
    /// Print the messages of a transcript
    Messages {
        file: PathBuf,
        /// Indent replies under the message they answer
        #[arg(long, conflicts_with = "json")]
        tree: bool,
        #[arg(long)]
        json: bool,
    },
    /// Delete a message and everything that descends from it
    DeleteFrom {
        file: PathBuf,
        uuid: String,
        #[arg(long)]
        json: bool,
    },
    /// Generate a summary with the configured summarizer and store it as the title
    Summarize {
        file: PathBuf,
        /// Defaults to the transcript's file name
        #[arg(long)]
        session_id: Option<String>,
        /// Defaults to the transcript's directory
        #[arg(long)]
        project_dir: Option<PathBuf>,
    },
    /// Set a session's title by hand
    Title {
        file: PathBuf,
        title: String,
    },
    /// Check or repair a project's index
    Index {
        #[command(subcommand)]
        action: IndexCommand,
    },
}

#[derive(Subcommand)]
pub enum IndexCommand {
    /// Report stale, orphaned and duplicate entries without writing; exits 1 if any
    Check {
        #[arg(allow_hyphen_values = true)]
        project: String,
        #[arg(long)]
        json: bool,
    },
    /// Rescan stale sessions and drop orphaned entries
    Repair {
        #[arg(allow_hyphen_values = true)]
        project: String,
        /// Rescan every transcript, not just stale ones
        #[arg(long)]
        rebuild: bool,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Projects { json } => {
            let projects = list_projects(&config.claude_dir()?)?;
            if json {
                print_json(&projects)?;
            } else if projects.is_empty() {
                println!("No projects found");
            } else {
                print!("{}", render_projects(&projects));
            }
        }
        Commands::Sessions { project, refresh, json } => {
            let project_dir = resolve_project(&project, &config)?;
            let mode = refresh.unwrap_or(config.index.refresh);
            let sessions = list_sessions(&project_dir, mode, &config.cleaner()?)
                .with_context(|| format!("Failed to list sessions in {}", project_dir.display()))?;
            if json {
                print_json(&sessions)?;
            } else {
                print!("{}", render_sessions(&sessions));
            }
        }
        Commands::Messages { file, tree, json } => {
            if json {
                print_json(&list_messages(&file)?)?;
            } else if tree {
                print!("{}", render_tree(&load_tree(&file)?));
            } else {
                print!("{}", render_messages(&list_messages(&file)?));
            }
        }
        Commands::DeleteFrom { file, uuid, json } => {
            let file = absolute(&file)?;
            let outcome = delete_from(&file, &uuid, &config.cleaner()?)?;
            if json {
                print_json(&outcome)?;
            } else {
                print!("{}", render_deletion(&outcome));
            }
        }
        Commands::Summarize { file, session_id, project_dir } => {
            let file = absolute(&file)?;
            let (session_id, project_dir) = session_target(&file, session_id, project_dir)?;
            let summarizer = config.summarizer()?;
            let summary = generate_and_merge_summary(
                &summarizer,
                &file,
                &session_id,
                &project_dir,
                &config.cleaner()?,
            )?;
            println!("{}", summary);
        }
        Commands::Title { file, title } => {
            let title = title.trim();
            if title.is_empty() {
                bail!("Title must not be empty");
            }
            let file = absolute(&file)?;
            let (session_id, project_dir) = session_target(&file, None, None)?;
            merge_summary(&project_dir, &session_id, &file, title)?;
        }
        Commands::Index { action: IndexCommand::Check { project, json } } => {
            let project_dir = resolve_project(&project, &config)?;
            let report = check_index(&project_dir)?;
            if json {
                print_json(&report)?;
            } else {
                print!("{}", render_check(&report));
            }
            if !report.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Index { action: IndexCommand::Repair { project, rebuild, json } } => {
            let project_dir = resolve_project(&project, &config)?;
            let cleaner = config.cleaner()?;
            let report = if rebuild {
                rebuild_index(&project_dir, &cleaner)?
            } else {
                repair_index(&project_dir, &cleaner)?
            };
            if json {
                print_json(&report)?;
            } else {
                print!("{}", render_repair(&report));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// A directory path as given, else an encoded project name under the Claude directory
fn resolve_project(project: &str, config: &Config) -> Result<PathBuf> {
    let as_path = Path::new(project);
    if as_path.is_dir() {
        return absolute(as_path);
    }

    let claude_dir = config.claude_dir()?;
    let named = claude_dir.join("projects").join(project);
    if named.is_dir() {
        return Ok(named);
    }
    bail!("No project directory {} (nor {})", project, named.display())
}

fn session_target(
    file: &Path,
    session_id: Option<String>,
    project_dir: Option<PathBuf>,
) -> Result<(String, PathBuf)> {
    let session_id = match session_id {
        Some(id) => id,
        None => session_id_from_path(file)
            .with_context(|| format!("Cannot derive a session id from {}", file.display()))?,
    };
    let project_dir = project_dir.unwrap_or_else(|| project_dir_of(file));
    Ok((session_id, project_dir))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid path {}", path.display()))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_index_repair() {
        let cli = Cli::try_parse_from(["session-keeper", "index", "repair", "/tmp/p", "--rebuild"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Index { action: IndexCommand::Repair { rebuild: true, json: false, .. } }
        ));
    }

    #[test]
    fn test_parse_refresh_mode() {
        let cli = Cli::try_parse_from(["session-keeper", "sessions", "p", "--refresh", "never"]).unwrap();
        assert!(matches!(cli.command, Commands::Sessions { refresh: Some(RefreshMode::Never), .. }));

        let cli = Cli::try_parse_from(["session-keeper", "sessions", "-Users-me-app", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Sessions { ref project, json: true, .. } if project == "-Users-me-app"));
        assert!(Cli::try_parse_from(["session-keeper", "sessions", "p", "--refresh", "often"]).is_err());
    }

    #[test]
    fn test_session_target_defaults() {
        let (id, dir) = session_target(Path::new("/p/abc.jsonl"), None, None).unwrap();
        assert_eq!(id, "abc");
        assert_eq!(dir, PathBuf::from("/p"));
    }
}
