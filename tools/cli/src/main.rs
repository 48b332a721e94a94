//! Stratus CLI - Interactive shell for RAM-only cloud mounting.
//!
//! This tool drives the mounter facade from a terminal: remotes are
//! defined, mounted, and unmounted with simple commands, status changes
//! stream back asynchronously, and every exit path unmounts all sessions
//! and wipes the in-memory configuration.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use stratus_app::{MountStatus, Mounter, StatusEvent};
use stratus_common::RemoteName;
use stratus_config::{providers, ConfigStore};
use stratus_mount::RcloneHelper;

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Stratus - mount cloud remotes as local drives, RAM-only")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Path or name of the external mount helper binary.
    #[arg(long, default_value = "rclone")]
    helper: String,
}

/// What the command loop should do next.
enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = Arc::new(ConfigStore::new());
    let helper = Arc::new(RcloneHelper::with_binary(&cli.helper));
    let (mounter, mut events) = Mounter::new(store, helper);

    if !mounter.helper_available() {
        println!(
            "warning: '{}' was not found. Install it from https://rclone.org/downloads/",
            cli.helper
        );
    }

    println!(
        "Stratus ({} backend) - nothing touches disk, everything unmounts on exit.",
        mounter.helper_name()
    );
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if let Flow::Quit = handle_line(&mounter, line.trim()).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            Some(event) = events.recv() => print_event(&event),
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    mounter.shutdown().await;
    println!("All sessions unmounted, configuration wiped.");
    Ok(())
}

/// Parse and execute one interactive command.
async fn handle_line(mounter: &Mounter, line: &str) -> Flow {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Flow::Continue;
    };
    let args: Vec<&str> = parts.collect();

    let result = match command {
        "add" => cmd_add(mounter, &args).await,
        "configure" => cmd_configure(mounter, &args).await,
        "mount" => cmd_mount(mounter, &args).await,
        "mount-all" => mounter.mount_all().await.map_err(Into::into),
        "unmount" => cmd_unmount(mounter, &args).await,
        "unmount-all" => mounter.unmount_all().await.map_err(Into::into),
        "remove" => cmd_remove(mounter, &args).await,
        "list" => cmd_list(mounter).await,
        "providers" => cmd_providers(),
        "help" => {
            print_help();
            Ok(())
        }
        "quit" | "exit" => return Flow::Quit,
        other => Err(anyhow::anyhow!(
            "Unknown command '{}'. Type 'help' for commands.",
            other
        )),
    };

    if let Err(e) = result {
        println!("error: {:#}", e);
    }
    Flow::Continue
}

/// Define a remote from typed-in fields: `add <name> <provider> [key=value ...]`.
async fn cmd_add(mounter: &Mounter, args: &[&str]) -> Result<()> {
    let [name, provider, fields @ ..] = args else {
        anyhow::bail!("usage: add <name> <provider> [key=value ...]");
    };

    let name = RemoteName::new(*name)?;
    let mut parsed = Vec::new();
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            anyhow::bail!("field '{}' is not key=value", field);
        };
        parsed.push((key.to_string(), value.to_string()));
    }

    mounter.add_remote(name.clone(), *provider, parsed).await;
    println!("{} added ({}), RAM only", name, provider);
    Ok(())
}

/// Run the helper's interactive authorization: `configure <name> <provider>`.
async fn cmd_configure(mounter: &Mounter, args: &[&str]) -> Result<()> {
    let [name, provider] = args else {
        anyhow::bail!("usage: configure <name> <provider>");
    };

    let name = RemoteName::new(*name)?;
    println!("Starting the helper's sign-in flow for {}...", name);
    mounter.configure(name, *provider).await?;
    Ok(())
}

/// Mount a remote: `mount <name> [provider]`.
async fn cmd_mount(mounter: &Mounter, args: &[&str]) -> Result<()> {
    let (name, provider) = match args {
        [name] => (RemoteName::new(*name)?, None),
        [name, provider] => (RemoteName::new(*name)?, Some(provider.to_string())),
        _ => anyhow::bail!("usage: mount <name> [provider]"),
    };

    let provider = match provider {
        Some(provider) => provider,
        None => mounter
            .remotes()
            .await
            .into_iter()
            .find(|info| info.name == name.as_str())
            .map(|info| info.provider)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "'{}' is not defined; pass a provider (mount {} drive) or add it first",
                    name,
                    name
                )
            })?,
    };

    println!("{} mounting...", name);
    mounter.mount(name, provider).await?;
    Ok(())
}

/// Unmount a remote: `unmount <name>`.
async fn cmd_unmount(mounter: &Mounter, args: &[&str]) -> Result<()> {
    let [name] = args else {
        anyhow::bail!("usage: unmount <name>");
    };
    mounter.unmount(RemoteName::new(*name)?).await?;
    Ok(())
}

/// Remove a remote definition: `remove <name>`.
async fn cmd_remove(mounter: &Mounter, args: &[&str]) -> Result<()> {
    let [name] = args else {
        anyhow::bail!("usage: remove <name>");
    };
    let name = RemoteName::new(*name)?;
    mounter.remove_remote(&name).await?;
    println!("{} removed", name);
    Ok(())
}

/// List defined remotes and their mount state.
async fn cmd_list(mounter: &Mounter) -> Result<()> {
    let infos = mounter.remotes().await;
    if infos.is_empty() {
        println!("No remotes defined. Use 'add' or 'configure' to create one.");
        return Ok(());
    }

    for info in &infos {
        match &info.mount_point {
            Some(mount_point) => {
                println!("  [LIVE] {} ({}) at {}", info.name, info.provider, mount_point)
            }
            None => println!("  [ -- ] {} ({})", info.name, info.provider),
        }
    }
    println!("{} mounted", mounter.mounted_count().await);
    Ok(())
}

/// Show the provider catalog.
fn cmd_providers() -> Result<()> {
    for info in providers::PROVIDERS {
        let auth = if info.requires_authorization {
            "interactive sign-in"
        } else {
            "key/field based"
        };
        println!("  {:10} {} ({})", info.tag, info.display_name, auth);
    }
    Ok(())
}

fn print_event(event: &StatusEvent) {
    match &event.status {
        MountStatus::Mounted { mount_point } => {
            println!("{} mounted at {}", event.remote, mount_point)
        }
        MountStatus::Unmounted => println!("{} unmounted", event.remote),
        MountStatus::MountFailed { reason } => {
            println!("{} mount failed: {}", event.remote, reason)
        }
        MountStatus::PoolExhausted => {
            println!(
                "{}: no drive letters left; unmounting frees none until restart",
                event.remote
            )
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  add <name> <provider> [key=value ...]  define a remote from fields");
    println!("  configure <name> <provider>            run the helper's sign-in flow");
    println!("  mount <name> [provider]                mount a remote");
    println!("  mount-all                              mount every defined remote");
    println!("  unmount <name>                         unmount a remote");
    println!("  unmount-all                            unmount everything");
    println!("  remove <name>                          forget a remote definition");
    println!("  list                                   show remotes and mount state");
    println!("  providers                              show the provider catalog");
    println!("  quit                                   unmount all, wipe, exit");
}
