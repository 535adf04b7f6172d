//! Mirra CLI - Command-line interface for addon collection mirroring
//!
//! Provides `mirra profile`, `mirra mirror`, `mirra sync`, and
//! `mirra backup` commands.

use clap::{Parser, Subcommand};
use mirra_core::backup::SnapshotSummary;
use mirra_core::collection::{AddonKey, Profile, ProfileId};
use mirra_core::diff::display::{format_operations, DiffSummary};
use mirra_core::reconcile::{CancelFlag, MirrorOutcome, RunReport};
use mirra_core::service::MirrorService;
use mirra_core::storage::Database;
use mirra_gateway::HttpGateway;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_API_URL: &str = "https://api.strem.io";

#[derive(Parser)]
#[command(name = "mirra")]
#[command(about = "Mirra - addon collection mirroring across accounts")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to ~/.mirra)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Collection API base URL
    #[arg(long, global = true, default_value = DEFAULT_API_URL)]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage account profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// Manage mirror bindings
    Mirror {
        #[command(subcommand)]
        action: MirrorCommands,
    },
    /// Reconcile mirrors with their masters
    Sync {
        /// Master profile to reconcile (omit with --all)
        master: Option<String>,

        /// Reconcile every master that has mirrors
        #[arg(long)]
        all: bool,

        /// Show the planned operations without applying them
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage collection snapshots
    Backup {
        #[command(subcommand)]
        action: BackupCommands,
    },
    /// Copy one profile's collection onto another, replacing it
    Clone {
        /// Source profile
        source: String,
        /// Target profile
        target: String,
        /// Copy only this addon (by manifest URL), appending it
        #[arg(long)]
        addon: Option<String>,
        /// Occurrence index when the URL appears more than once
        #[arg(long, default_value_t = 0, requires = "addon")]
        occurrence: usize,
    },
    /// Install an addon from its manifest URL
    Install {
        /// Profile to install onto
        profile: String,
        /// Addon manifest URL
        url: String,
    },
    /// Show a profile's current collection
    Show {
        /// Profile to inspect
        profile: String,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Register a profile
    Add {
        /// Profile identifier
        id: String,
        /// Display name (defaults to the identifier)
        #[arg(short, long)]
        name: Option<String>,
        /// Auth key for the collection API
        #[arg(short, long)]
        auth_key: Option<String>,
    },
    /// List registered profiles
    List,
    /// Remove a profile and its bindings
    Remove {
        /// Profile identifier
        id: String,
    },
}

#[derive(Subcommand)]
enum MirrorCommands {
    /// Bind a mirror profile to a master profile
    Add {
        /// Master profile
        master: String,
        /// Mirror profile
        mirror: String,
    },
    /// Remove a mirror's binding
    Remove {
        /// Mirror profile
        mirror: String,
    },
    /// List registered bindings
    List,
    /// Protect an addon on a mirror from reconciliation
    Protect {
        /// Mirror profile
        mirror: String,
        /// Addon manifest URL
        url: String,
        /// Occurrence index when the URL appears more than once
        #[arg(long, default_value_t = 0)]
        occurrence: usize,
    },
    /// Remove an addon's protection
    Unprotect {
        /// Mirror profile
        mirror: String,
        /// Addon manifest URL
        url: String,
        /// Occurrence index when the URL appears more than once
        #[arg(long, default_value_t = 0)]
        occurrence: usize,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Snapshot a profile's current collection
    Create {
        /// Profile to snapshot
        profile: String,
        /// Snapshot description
        #[arg(short, long, default_value = "manual snapshot")]
        description: String,
    },
    /// List a profile's snapshots
    List {
        /// Profile to list
        profile: String,
    },
    /// Reconcile a profile back to a snapshot
    Restore {
        /// Profile to restore
        profile: String,
        /// Snapshot id
        id: String,
    },
    /// Delete a snapshot
    Delete {
        /// Snapshot id
        id: String,
    },
    /// Replace a snapshot's description
    Rename {
        /// Snapshot id
        id: String,
        /// New description
        description: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)?;
    let db = Database::open(&data_dir.join("mirra.db"))?;

    let mut gateway = HttpGateway::new(&cli.api_url);
    {
        let profiles = mirra_core::storage::ProfileStore::new(db.connection());
        for profile in profiles.list()? {
            if let Some(key) = &profile.auth_key {
                gateway.add_credential(profile.id.clone(), key.clone());
            }
        }
    }
    let mut service = MirrorService::new(db, Arc::new(gateway))?;

    match cli.command {
        Commands::Profile { action } => run_profile(&mut service, action),
        Commands::Mirror { action } => run_mirror(&mut service, action),
        Commands::Sync {
            master,
            all,
            dry_run,
        } => run_sync(&service, master, all, dry_run).await,
        Commands::Backup { action } => run_backup(&service, action).await,
        Commands::Clone {
            source,
            target,
            addon,
            occurrence,
        } => {
            let source = ProfileId::from(source);
            let target = ProfileId::from(target);
            if let Some(url) = addon {
                let key = AddonKey {
                    transport_url: url,
                    occurrence,
                };
                let copied = service.clone_addon(&source, &key, &target).await?;
                println!("Cloned '{}' onto {target}.", copied.name);
            } else {
                let outcome = service
                    .clone_collection(&source, &target, &CancelFlag::new())
                    .await?;
                print_outcome(&target, &outcome);
            }
            Ok(())
        }
        Commands::Install { profile, url } => {
            let addon = service
                .install_addon(&ProfileId::from(profile), &url)
                .await?;
            println!(
                "Installed '{}' ({} catalog(s)).",
                addon.name,
                addon.catalogs.len()
            );
            Ok(())
        }
        Commands::Show { profile } => {
            let collection = service.fetch_collection(&ProfileId::from(profile)).await?;
            if collection.is_empty() {
                println!("No addons installed.");
            }
            for addon in &collection.addons {
                println!("{:>3}. {} ({})", addon.position, addon.name, addon.transport_url);
                for catalog in &addon.catalogs {
                    let mark = if catalog.enabled { "x" } else { " " };
                    println!("       [{mark}] {}", catalog.id);
                }
            }
            Ok(())
        }
    }
}

fn default_data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base = dirs::home_dir().ok_or("could not determine home directory")?;
    Ok(base.join(".mirra"))
}

fn run_profile<G: mirra_core::CollectionGateway + 'static>(
    service: &mut MirrorService<G>,
    action: ProfileCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ProfileCommands::Add { id, name, auth_key } => {
            let display_name = name.unwrap_or_else(|| id.clone());
            let mut profile = Profile::new(ProfileId::from(id), display_name);
            if let Some(key) = auth_key {
                profile = profile.with_auth_key(key);
            }
            service.add_profile(profile.clone())?;
            println!("Registered profile: {}", profile.id);
        }
        ProfileCommands::List => {
            let profiles = service.list_profiles()?;
            if profiles.is_empty() {
                println!("No profiles registered.");
            } else {
                println!("Profiles:");
                for p in profiles {
                    let auth = if p.auth_key.is_some() {
                        "authenticated"
                    } else {
                        "no auth key"
                    };
                    println!("  {} - {} ({auth})", p.id, p.display_name);
                }
            }
        }
        ProfileCommands::Remove { id } => {
            let id = ProfileId::from(id);
            if service.remove_profile(&id)? {
                println!("Removed profile: {id}");
            } else {
                println!("No such profile: {id}");
            }
        }
    }
    Ok(())
}

fn run_mirror<G: mirra_core::CollectionGateway + 'static>(
    service: &mut MirrorService<G>,
    action: MirrorCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        MirrorCommands::Add { master, mirror } => {
            let added =
                service.add_binding(ProfileId::from(master.clone()), ProfileId::from(mirror.clone()))?;
            if added {
                println!("'{mirror}' now mirrors '{master}'.");
            } else {
                println!("'{mirror}' already mirrors '{master}'.");
            }
        }
        MirrorCommands::Remove { mirror } => {
            let mirror = ProfileId::from(mirror);
            if service.remove_binding(&mirror)? {
                println!("Unbound mirror: {mirror}");
            } else {
                println!("No binding for: {mirror}");
            }
        }
        MirrorCommands::List => {
            let bindings = service.registry().bindings();
            if bindings.is_empty() {
                println!("No bindings registered.");
            } else {
                println!("Bindings:");
                for b in bindings {
                    println!("  {} -> {}", b.mirror, b.master);
                }
            }
        }
        MirrorCommands::Protect {
            mirror,
            url,
            occurrence,
        } => {
            let key = AddonKey {
                transport_url: url.clone(),
                occurrence,
            };
            service.protect(&ProfileId::from(mirror), key)?;
            println!("Protected: {url}");
        }
        MirrorCommands::Unprotect {
            mirror,
            url,
            occurrence,
        } => {
            let key = AddonKey {
                transport_url: url.clone(),
                occurrence,
            };
            if service.unprotect(&ProfileId::from(mirror), &key)? {
                println!("Unprotected: {url}");
            } else {
                println!("Not protected: {url}");
            }
        }
    }
    Ok(())
}

async fn run_sync<G: mirra_core::CollectionGateway + 'static>(
    service: &MirrorService<G>,
    master: Option<String>,
    all: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancelFlag::new();

    if all {
        let results = service.run_all(&cancel).await;
        if results.is_empty() {
            println!("No masters with mirrors.");
        }
        let mut failed = false;
        for (master, result) in results {
            match result {
                Ok(report) => {
                    failed |= !report.all_synced();
                    print_report(&report);
                }
                Err(e) => {
                    failed = true;
                    println!("{master}: failed: {e}");
                }
            }
        }
        if failed {
            return Err("one or more mirrors failed to sync".into());
        }
        return Ok(());
    }

    let master = ProfileId::from(master.ok_or("specify a master profile or --all")?.as_str());

    if dry_run {
        let mirrors: Vec<ProfileId> = service
            .registry()
            .mirrors_of(&master)
            .into_iter()
            .cloned()
            .collect();
        if mirrors.is_empty() {
            return Err(format!("'{master}' has no mirrors").into());
        }
        for mirror in mirrors {
            let ops = service.preview(&master, &mirror).await?;
            if ops.is_empty() {
                println!("{mirror}: in sync.");
            } else {
                println!("{mirror}:");
                print!("{}", format_operations(&ops));
                println!("  Summary: {}", DiffSummary::from_ops(&ops).one_line());
            }
        }
        println!("\nDry run - no changes made.");
        return Ok(());
    }

    let report = service.run_reconciliation(&master, &cancel).await?;
    print_report(&report);
    if !report.all_synced() {
        return Err("one or more mirrors failed to sync".into());
    }
    Ok(())
}

async fn run_backup<G: mirra_core::CollectionGateway + 'static>(
    service: &MirrorService<G>,
    action: BackupCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        BackupCommands::Create {
            profile,
            description,
        } => {
            let snapshot = service
                .create_backup(&ProfileId::from(profile), description)
                .await?;
            println!(
                "Created snapshot {} ({} addon(s)).",
                snapshot.id,
                snapshot.collection.len()
            );
        }
        BackupCommands::List { profile } => {
            let summaries = service.list_backups(&ProfileId::from(profile))?;
            if summaries.is_empty() {
                println!("No snapshots.");
            } else {
                println!("Snapshots:");
                for s in summaries {
                    print_summary(&s);
                }
            }
        }
        BackupCommands::Restore { profile, id } => {
            let id = Uuid::parse_str(&id)?;
            let profile = ProfileId::from(profile);
            let outcome = service
                .restore_backup(&profile, id, &CancelFlag::new())
                .await?;
            print_outcome(&profile, &outcome);
        }
        BackupCommands::Delete { id } => {
            let id = Uuid::parse_str(&id)?;
            if service.delete_backup(id)? {
                println!("Deleted snapshot: {id}");
            } else {
                println!("No such snapshot: {id}");
            }
        }
        BackupCommands::Rename { id, description } => {
            let id = Uuid::parse_str(&id)?;
            service.rename_backup(id, &description)?;
            println!("Renamed snapshot: {id}");
        }
    }
    Ok(())
}

fn print_summary(summary: &SnapshotSummary) {
    println!(
        "  {} - {} ({} addon(s), {})",
        summary.id,
        summary.description,
        summary.addon_count,
        summary.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}

fn print_report(report: &RunReport) {
    println!("Master: {}", report.master);
    for mirror in &report.mirrors {
        print_outcome(&mirror.mirror, &mirror.outcome);
    }
}

fn print_outcome(profile: &ProfileId, outcome: &MirrorOutcome) {
    match outcome {
        MirrorOutcome::Synced { applied } => {
            if applied.is_empty() {
                println!("  {profile}: already in sync.");
            } else {
                println!("  {profile}: synced ({} operation(s)).", applied.len());
            }
        }
        MirrorOutcome::Partial {
            applied,
            unapplied,
            cause,
        } => {
            println!(
                "  {profile}: partial - {} applied, {} pending ({cause}).",
                applied.len(),
                unapplied.len()
            );
        }
        MirrorOutcome::FetchFailed { cause } => {
            println!("  {profile}: fetch failed ({cause}).");
        }
    }
}
