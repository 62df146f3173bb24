//! rubriq-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `RUBRIQ_*`
//! environment variables, opens the SQLite store, and serves the API over
//! HTTP. The remaining subcommands are operator tools:
//!
//! ```text
//! rubriq-server hash-password
//! rubriq-server add-teacher --email ms.example@school.test --name "Ms Example"
//! rubriq-server set-plan --email ms.example@school.test --plan pro --status active
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rubriq_core::{
  profile::{NewProfile, NewSubscription, Plan, SubscriptionStatus},
  store::GradingStore,
};
use rubriq_openai::OpenAiGrader;
use rubriq_server::{ServerConfig, auth, expand_tilde};
use rubriq_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Rubriq essay grading server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin.
  HashPassword,
  /// Create a teacher profile; the password is read from stdin.
  AddTeacher {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name:  String,
    #[arg(long, default_value = "free")]
    plan:  Plan,
  },
  /// Record a subscription change and update the teacher's plan.
  SetPlan {
    #[arg(long)]
    email:     String,
    #[arg(long)]
    plan:      Plan,
    #[arg(long, default_value = "active")]
    status:    SubscriptionStatus,
    /// Billing-provider reference to store with the subscription.
    #[arg(long)]
    reference: Option<String>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if let Some(Command::HashPassword) = cli.command {
    println!("{}", hash(&read_password()?)?);
    return Ok(());
  }

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(server_cfg, store).await,
    Command::HashPassword => Ok(()),
    Command::AddTeacher { email, name, plan } => {
      let password_hash = hash(&read_password()?)?;
      let profile = store
        .add_profile(NewProfile { email, display_name: name, password_hash, plan })
        .await
        .context("failed to add teacher")?;
      println!("{} {}", profile.profile_id, profile.email);
      Ok(())
    }
    Command::SetPlan { email, plan, status, reference } => {
      let profile = store
        .find_profile_by_email(email.clone())
        .await
        .context("failed to look up teacher")?
        .with_context(|| format!("no teacher with email {email}"))?;
      let subscription = store
        .record_subscription(NewSubscription {
          profile_id: profile.profile_id,
          plan,
          status,
          external_ref: reference,
          current_period_end: None,
        })
        .await
        .context("failed to record subscription")?;
      println!(
        "{} is now on the {} plan ({})",
        profile.email,
        subscription.effective_plan().as_str(),
        subscription.status.as_str()
      );
      Ok(())
    }
  }
}

async fn serve(server_cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let openai = server_cfg
    .openai
    .as_ref()
    .context("missing [openai] configuration (set RUBRIQ_OPENAI__API_KEY)")?;
  let grader = OpenAiGrader::new(openai).context("failed to configure the OpenAI grader")?;
  tracing::info!(model = grader.model(), "grader ready");

  let app = rubriq_server::router(Arc::new(store), Arc::new(grader));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

fn hash(password: &str) -> anyhow::Result<String> {
  auth::hash_password(password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\n', '\r']).to_owned();
  anyhow::ensure!(!password.is_empty(), "password must not be empty");
  Ok(password)
}
