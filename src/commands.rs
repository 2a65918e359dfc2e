//! Management commands, the equivalent of Django's `manage.py`.
//!
//! ```text
//! manage runserver [ADDRESS]
//! manage migrate [--list]
//! manage showurls [--names]
//! manage check
//! manage createquestion --text "What's up?" --choice "Not much" --choice "The sky"
//! ```

use anyhow::Context as _;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::apps::polls::{ChoiceManager, QuestionManager};
use crate::conf::Settings;
use crate::config::Application;
use crate::db;
use crate::logging::init_logging;
use crate::server::{HttpServer, shutdown_signal};

/// Site management CLI
#[derive(Debug, Parser)]
#[command(name = "manage")]
#[command(about = "mysite management interface", long_about = None)]
#[command(version)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,

	/// Settings file (default: settings.toml, or $MYSITE_SETTINGS_FILE)
	#[arg(long, global = true, value_name = "FILE")]
	pub settings: Option<PathBuf>,

	/// Verbosity level (can be repeated for more output)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbosity: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
	/// Apply pending migrations and start the development server
	Runserver {
		/// Server address (default: server.host:server.port from settings)
		#[arg(value_name = "ADDRESS")]
		address: Option<String>,
	},

	/// Apply database migrations
	Migrate {
		/// List migrations and whether they are applied, without applying
		#[arg(long)]
		list: bool,
	},

	/// Display all registered URL patterns
	Showurls {
		/// Show only named URLs
		#[arg(long)]
		names: bool,
	},

	/// Check settings, templates and routes for problems
	Check,

	/// Create a poll question with its choices
	Createquestion {
		#[arg(long)]
		text: String,

		/// Publish date offset in days from now (negative for the past)
		#[arg(long, default_value_t = 0, allow_hyphen_values = true)]
		days: i64,

		/// A choice; repeat for several
		#[arg(long = "choice", value_name = "TEXT")]
		choices: Vec<String>,
	},
}

/// Parse the command line and run the selected command
pub async fn execute_from_command_line() -> anyhow::Result<()> {
	let cli = Cli::parse();
	run_command(cli).await
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
	let mut settings = match &cli.settings {
		Some(path) => Settings::load_from(path)?,
		None => Settings::load()?,
	};
	match cli.verbosity {
		0 => {}
		1 => settings.logging.level = "debug".to_string(),
		_ => settings.logging.level = "trace".to_string(),
	}
	init_logging(&settings.logging);

	match cli.command {
		Commands::Runserver { address } => execute_runserver(settings, address).await,
		Commands::Migrate { list } => execute_migrate(settings, list).await,
		Commands::Showurls { names } => execute_showurls(settings, names).await,
		Commands::Check => execute_check(settings).await,
		Commands::Createquestion {
			text,
			days,
			choices,
		} => execute_createquestion(settings, text, days, choices).await,
	}
}

async fn execute_runserver(settings: Settings, address: Option<String>) -> anyhow::Result<()> {
	let address = address.unwrap_or_else(|| settings.bind_address());
	let addr: SocketAddr = address
		.parse()
		.with_context(|| format!("Invalid server address '{}'", address))?;

	let pool = db::create_pool(&settings.database.url, settings.database.max_connections).await?;
	db::run_migrations(&pool).await?;

	let app = Application::build(settings, pool)?;
	HttpServer::new(Arc::new(app))
		.listen_with_shutdown(addr, shutdown_signal())
		.await
		.map_err(|e| anyhow::anyhow!(e))
}

async fn execute_migrate(settings: Settings, list: bool) -> anyhow::Result<()> {
	let pool = db::create_pool(&settings.database.url, settings.database.max_connections).await?;

	if !list {
		db::run_migrations(&pool).await?;
	}
	for (version, description, applied) in db::migration_status(&pool).await? {
		let mark = if applied { "X" } else { " " };
		println!("[{}] {} {}", mark, version, description);
	}
	Ok(())
}

async fn execute_showurls(settings: Settings, names: bool) -> anyhow::Result<()> {
	let pool = db::create_pool(&settings.database.url, settings.database.max_connections).await?;
	let app = Application::build(settings, pool)?;

	for route in app.routes() {
		match (&route.name, names) {
			(Some(name), _) => println!("{:<48} {:<24} {}", route.path, name, route.methods),
			(None, false) => println!("{:<48} {:<24} {}", route.path, "-", route.methods),
			(None, true) => {}
		}
	}
	Ok(())
}

async fn execute_check(settings: Settings) -> anyhow::Result<()> {
	settings.validate()?;
	let pool = db::create_pool(&settings.database.url, settings.database.max_connections).await?;
	let app = Application::build(settings, pool)?;

	let mut issues = Vec::new();
	for template in [
		"polls/index.html",
		"polls/detail.html",
		"polls/results.html",
		"admin/index.html",
		"admin/change_list.html",
		"admin/change_form.html",
		"admin/delete_confirmation.html",
	] {
		if !app.state().templates.has_template(template) {
			issues.push(format!("Template '{}' is missing", template));
		}
	}

	let pending: Vec<String> = db::migration_status(&app.state().pool)
		.await?
		.into_iter()
		.filter(|(_, _, applied)| !applied)
		.map(|(version, description, _)| format!("{} {}", version, description))
		.collect();
	if !pending.is_empty() {
		println!("Unapplied migrations: {}. Run 'manage migrate'.", pending.join(", "));
	}

	if issues.is_empty() {
		println!("System check identified no issues.");
		Ok(())
	} else {
		for issue in &issues {
			println!("ERROR: {}", issue);
		}
		anyhow::bail!("System check identified {} issue(s)", issues.len())
	}
}

async fn execute_createquestion(
	settings: Settings,
	text: String,
	days: i64,
	choices: Vec<String>,
) -> anyhow::Result<()> {
	let pool = db::create_pool(&settings.database.url, settings.database.max_connections).await?;
	db::run_migrations(&pool).await?;

	let question = QuestionManager::new(pool.clone())
		.create(&text, Utc::now() + Duration::days(days))
		.await?;
	let manager = ChoiceManager::new(pool);
	for choice in &choices {
		manager.create(question.id, choice, 0).await?;
	}

	println!(
		"Created question {} \"{}\" with {} choice(s)",
		question.id,
		question.question_text,
		choices.len()
	);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_parse_createquestion() {
		let cli = Cli::try_parse_from([
			"manage",
			"createquestion",
			"--text",
			"What's up?",
			"--days",
			"-2",
			"--choice",
			"Not much",
			"--choice",
			"The sky",
		])
		.unwrap();

		let Commands::Createquestion { text, days, choices } = cli.command else {
			panic!("expected createquestion");
		};
		assert_eq!(text, "What's up?");
		assert_eq!(days, -2);
		assert_eq!(choices, vec!["Not much", "The sky"]);
	}

	#[rstest]
	fn test_global_flags_after_subcommand() {
		let cli = Cli::try_parse_from(["manage", "runserver", "0.0.0.0:9000", "-vv", "--settings", "prod.toml"])
			.unwrap();
		assert_eq!(cli.verbosity, 2);
		assert_eq!(cli.settings, Some(PathBuf::from("prod.toml")));
		assert!(matches!(cli.command, Commands::Runserver { address: Some(ref a) } if a == "0.0.0.0:9000"));
	}

	#[rstest]
	fn test_cli_definition_is_valid() {
		use clap::CommandFactory;
		Cli::command().debug_assert();
	}
}
