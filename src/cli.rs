use crate::catalog::CatalogClient;
use crate::context::AppContext;
use crate::model::{
    ImageRegistration, LaunchRequest, Settings, SourceSubmission, WorkloadStatus,
};
use crate::runtime::{ContainerRuntime, ImageRuntime};
use crate::{builder, credentials, export, render, validation};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_API_URL: &str = "http://localhost:8081";
pub const DOCKER_HUB: &str = "https://index.docker.io/v1/";
const PASSWORD_ENV: &str = "RUNES_REGISTRY_PASSWORD";

#[derive(Debug, Parser, Clone)]
#[command(
    name = "runes",
    version,
    about = "Run, build and track Docker-packaged remote workloads"
)]
pub struct Cli {
    /// Directory holding the ledger database, key file and logs
    #[arg(long, env = "RUNES_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the remote catalog service
    #[arg(long, env = "RUNES_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Base URL of the token verification service (defaults to --api-url)
    #[arg(long, env = "RUNES_AUTH_URL", global = true)]
    pub auth_url: Option<String>,

    /// Path to the docker binary
    #[arg(long = "docker", env = "RUNES_DOCKER", default_value = "docker", global = true)]
    pub docker_bin: String,

    /// Environment variable that carries the access token into containers
    #[arg(long, default_value = "DAWNET_TOKEN", global = true)]
    pub token_env: String,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Also log to stderr (ignored while the TUI is open)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List workloads that are running right now (stale ledger rows are healed)
    Running,
    /// Show the full ledger of launched workloads
    Ledger {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long)]
        export_json: Option<PathBuf>,
        #[arg(long)]
        export_csv: Option<PathBuf>,
    },
    /// Start a container from an image and record it
    Run {
        image: String,
        /// Display name (defaults to the image)
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Request all GPUs
        #[arg(long)]
        gpu: bool,
    },
    /// Stop a container and mark it stopped in the ledger
    Stop { container_id: String },
    /// Follow a container's logs until it exits or Ctrl-C
    Logs { container_id: String },
    /// Manage the access token injected into workloads
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// List catalog images, or local images with --local
    Images {
        #[arg(long)]
        local: bool,
    },
    /// List catalog notebook sources
    Sources,
    /// Build an image from a notebook URL or local .ipynb file
    Build { source: String, image: String },
    /// Publish a notebook source to the catalog
    PublishSource {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        colab_url: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Push a local image to the registry and register it in the catalog
    PublishImage {
        local_image: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        author: String,
        /// Registry tag and catalog version
        #[arg(long, default_value = "latest")]
        version: String,
    },
    /// Remove an image entry from the catalog
    DeleteImage { id: String },
    /// Remove a source entry from the catalog
    DeleteSource { id: String },
    /// Store registry credentials after a successful login
    Login {
        #[arg(long)]
        username: String,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum TokenAction {
    Show,
    Set { token: String },
    Generate,
    /// Ask the auth service whether the stored token is valid
    Verify,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Running,
    Stopped,
}

impl From<StatusArg> for WorkloadStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Running => WorkloadStatus::Running,
            StatusArg::Stopped => WorkloadStatus::Stopped,
        }
    }
}

/// Build `Settings` from CLI arguments.
pub fn build_settings(args: &Cli) -> Result<Settings> {
    let data_dir = match &args.data_dir {
        Some(d) => d.clone(),
        None => dirs::data_dir()
            .or_else(dirs::home_dir)
            .context("cannot determine a data directory; pass --data-dir")?
            .join("runes_cli"),
    };
    let api_url = args.api_url.trim_end_matches('/').to_string();
    let auth_url = args
        .auth_url
        .as_deref()
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|| api_url.clone());
    Ok(Settings {
        data_dir,
        api_url,
        auth_url,
        docker_bin: args.docker_bin.clone(),
        token_env: args.token_env.clone(),
        registry: DOCKER_HUB.to_string(),
        user_agent: format!("runes-cli/{}", env!("CARGO_PKG_VERSION")),
    })
}

impl Command {
    fn needs_runtime(&self) -> bool {
        match self {
            Command::Running
            | Command::Run { .. }
            | Command::Stop { .. }
            | Command::Logs { .. }
            | Command::Build { .. }
            | Command::PublishImage { .. }
            | Command::Login { .. } => true,
            Command::Images { local } => *local,
            _ => false,
        }
    }
}

pub async fn run(args: Cli, settings: Settings) -> Result<()> {
    let mut ctx = AppContext::open(settings).context("open ledger")?;
    let needs_runtime = args.command.as_ref().map_or(true, Command::needs_runtime);
    if needs_runtime {
        ctx.runtime
            .ping()
            .context("cannot reach the container runtime")?;
    }
    let token = ctx.ensure_token().context("load access token")?;
    let catalog = CatalogClient::new(&ctx.settings)?;

    let Some(command) = args.command.clone() else {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(ctx, catalog).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            return show_running(&args, &ctx);
        }
    };

    match command {
        Command::Running => show_running(&args, &ctx),
        Command::Ledger {
            status,
            export_json,
            export_csv,
        } => {
            let rows = ctx.store.list_by_status(status.map(Into::into))?;
            if let Some(p) = export_json.as_deref() {
                export::export_json(p, &rows)?;
                eprintln!("Exported JSON: {}", p.display());
            }
            if let Some(p) = export_csv.as_deref() {
                export::export_csv(p, &rows)?;
                eprintln!("Exported CSV: {}", p.display());
            }
            emit(&args, &rows, || render::workloads("Ledger", &rows))
        }
        Command::Run {
            image,
            name,
            description,
            gpu,
        } => {
            let req = LaunchRequest {
                remote_name: name.unwrap_or_else(|| image.clone()),
                image,
                remote_description: description,
                token: Some(token),
                gpu,
            };
            let row = tokio::task::block_in_place(|| ctx.lifecycle().start(&req))
                .with_context(|| format!("start {}", req.image))?;
            emit(&args, &row, || render::TextView {
                lines: vec![format!("Started {} ({})", row.short_id(), row.remote_name)],
            })
        }
        Command::Stop { container_id } => {
            tokio::task::block_in_place(|| ctx.lifecycle().stop(&container_id))
                .with_context(|| format!("stop {container_id}"))?;
            println!("Stopped {container_id}");
            Ok(())
        }
        Command::Logs { container_id } => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            tokio::task::block_in_place(|| ctx.lifecycle().logs(&container_id, &mut out))
                .with_context(|| format!("logs for {container_id}"))?;
            Ok(())
        }
        Command::Token { action } => token_command(&args, &mut ctx, &catalog, action).await,
        Command::Images { local: true } => {
            let images = ctx.runtime.list_images()?;
            emit(&args, &images, || render::local_images(&images))
        }
        Command::Images { local: false } => {
            let images = catalog.list_images().await?;
            emit(&args, &images, || render::catalog_images(&images))
        }
        Command::Sources => {
            let sources = catalog.list_sources().await?;
            emit(&args, &sources, || render::catalog_sources(&sources))
        }
        Command::Build { source, image } => {
            validation::validate_image_name(&image).with_context(|| {
                format!("try --image {}", validation::format_image_name(&image))
            })?;
            let staged = builder::stage(catalog.http(), &source).await?;
            tokio::task::block_in_place(|| {
                staged.build(&ctx.runtime, &image, &mut |line: &str| println!("{line}"))
            })?;
            println!("Built {image}");
            Ok(())
        }
        Command::PublishSource {
            source,
            colab_url,
            name,
            description,
            category,
            author,
            version,
        } => {
            if source.is_none() && colab_url.is_none() {
                bail!("pass --source or --colab-url");
            }
            if let Some(src) = source.as_deref() {
                if !src.starts_with("http://") && !src.starts_with("https://") {
                    bail!("--source must be an http(s) URL");
                }
            }
            validation::validate_field("name", &name, 1, 100)?;
            validation::validate_field("description", &description, 1, 1000)?;
            let body = SourceSubmission {
                remote_name: name,
                remote_description: description,
                remote_category: category,
                remote_author: author,
                source_url: source,
                colab_url,
                remote_version: version,
            };
            catalog.publish_source(&body, &token).await?;
            println!("Published source {}", body.remote_name);
            Ok(())
        }
        Command::PublishImage {
            local_image,
            name,
            description,
            category,
            author,
            version,
        } => {
            let body = tokio::task::block_in_place(|| {
                push_image(&ctx, &local_image, &version).map(|repository| ImageRegistration {
                    remote_name: name,
                    remote_description: description,
                    remote_category: category,
                    remote_author: author,
                    image_name: repository,
                    remote_version: version.clone(),
                })
            })?;
            catalog.register_image(&body, &token).await?;
            println!("Registered {} in the catalog", body.image_name);
            Ok(())
        }
        Command::DeleteImage { id } => {
            catalog.delete_image(&id, &token).await?;
            println!("Deleted image {id}");
            Ok(())
        }
        Command::DeleteSource { id } => {
            catalog.delete_source(&id, &token).await?;
            println!("Deleted source {id}");
            Ok(())
        }
        Command::Login { username } => {
            let password = read_password()?;
            let key = credentials::load_or_create_key(&ctx.settings.key_path())?;
            let registry = ctx.settings.registry.clone();
            tokio::task::block_in_place(|| {
                credentials::login_and_save(
                    &mut ctx.store,
                    &key,
                    &ctx.runtime,
                    &registry,
                    &username,
                    &password,
                )
            })
            .context("registry login failed")?;
            println!("Logged in to {registry} as {username}");
            Ok(())
        }
    }
}

fn show_running<R: ContainerRuntime + ImageRuntime>(args: &Cli, ctx: &AppContext<R>) -> Result<()> {
    let report = tokio::task::block_in_place(|| ctx.reconciler().reconcile())
        .context("reconcile running workloads")?;
    if !report.healed.is_empty() {
        info!(healed = ?report.healed, "healed stale rows");
    }
    emit(args, &report.running, || render::reconciled(&report))
}

async fn token_command<R: ContainerRuntime + ImageRuntime>(
    args: &Cli,
    ctx: &mut AppContext<R>,
    catalog: &CatalogClient,
    action: TokenAction,
) -> Result<()> {
    match action {
        TokenAction::Show => {
            let token = ctx.ensure_token()?;
            emit(args, &token, || render::TextView {
                lines: vec![token.clone()],
            })
        }
        TokenAction::Set { token } => {
            ctx.set_token(token.trim())?;
            println!("Token saved");
            Ok(())
        }
        TokenAction::Generate => {
            let token = ctx.regenerate_token()?;
            println!("{token}");
            Ok(())
        }
        TokenAction::Verify => {
            let token = ctx.ensure_token()?;
            let ok = catalog.verify_token(&token).await?;
            emit(args, &ok, || render::TextView {
                lines: vec![if ok {
                    "Token is valid".to_string()
                } else {
                    "Token was rejected".to_string()
                }],
            })?;
            if !ok {
                bail!("token verification failed");
            }
            Ok(())
        }
    }
}

/// Log in (cached credentials first), tag and push. Returns the namespaced
/// repository without its tag.
fn push_image<R: ContainerRuntime + ImageRuntime>(
    ctx: &AppContext<R>,
    local_image: &str,
    tag: &str,
) -> Result<String> {
    let key = credentials::load_or_create_key(&ctx.settings.key_path())?;
    let user = credentials::login_cached(&ctx.store, &key, &ctx.runtime, &ctx.settings.registry)?
        .ok_or_else(|| anyhow!("not logged in to the registry; run `runes login --username <USER>`"))?;

    let local_repo = local_image.split(':').next().unwrap_or(local_image);
    let base = local_repo.rsplit('/').next().unwrap_or(local_repo);
    // Pushed under the registry user's own namespace.
    let repository = format!("{user}/{base}");
    let reference = format!("{repository}:{tag}");
    validation::validate_image_name(&reference)?;

    ctx.runtime
        .tag(local_image, &reference)
        .with_context(|| format!("tag {local_image} as {reference}"))?;

    let mut saw_digest = false;
    ctx.runtime
        .push(&reference, &mut |line: &str| {
            if line.contains("digest:") {
                saw_digest = true;
            }
            println!("{line}");
        })
        .with_context(|| format!("push {reference}"))?;
    if !saw_digest {
        bail!("push of {reference} finished without a digest");
    }
    info!(reference = %reference, "pushed image");
    Ok(repository)
}

fn read_password() -> Result<String> {
    if let Ok(p) = std::env::var(PASSWORD_ENV) {
        if !p.is_empty() {
            return Ok(p);
        }
    }
    eprint!("Registry password: ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("empty password");
    }
    Ok(password)
}

/// Print `value` as JSON under `--json`, otherwise the text view.
fn emit<T: Serialize + ?Sized>(
    args: &Cli,
    value: &T,
    text: impl FnOnce() -> render::TextView,
) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text().print();
    }
    Ok(())
}
