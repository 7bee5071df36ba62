// SPDX-License-Identifier: MPL-2.0

use clap::{Parser, Subcommand};
use nostr_sdk::prelude::Keys;
use nostrfeed::api::ApiClient;
use nostrfeed::app::{App, AppError};
use nostrfeed::cache::CacheDb;
use nostrfeed::config::MAX_CONCURRENT_REQUESTS;
use nostrfeed::feed::RequestQueue;
use nostrfeed::format::{display_name, format_count, format_relative_time, preview};
use nostrfeed::protocol::{Algorithm, Note, events, keys};
use nostrfeed::relay::RelayPool;
use nostrfeed::runtime;
use nostrfeed::state::{AppSettings, KeyStore};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Terminal client for Nostr feeds
#[derive(Parser, Debug)]
#[command(name = "nostrfeed")]
#[command(about = "Read and publish Nostr notes from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate or inspect signing keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Store a secret key (nsec or hex) in the keyring
    Login { nsec: String },
    /// Remove the stored key
    Logout,
    /// Show your feed
    Feed {
        /// Algorithm id from the backend; defaults to the Following feed
        #[arg(long)]
        algo: Option<String>,
        /// Only notes from the last SECS seconds
        #[arg(long)]
        since: Option<u64>,
    },
    /// Show a profile
    Profile { npub: String },
    /// Publish a text note
    Post { text: String },
    /// Local cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum KeysAction {
    /// Print a fresh key pair
    Generate,
    /// Print the public key of the stored key
    Show,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Delete expired cache rows
    Cleanup,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "nostrfeed=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match runtime::block_on(run(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), AppError> {
    match command {
        Command::Keys { action } => match action {
            KeysAction::Generate => {
                let keys = keys::generate();
                println!("npub: {}", keys::npub(&keys.public_key())?);
                println!("nsec: {}", keys::nsec(&keys)?);
            }
            KeysAction::Show => {
                let keys = KeyStore::load().await?;
                println!("{}", keys::npub(&keys.public_key())?);
            }
        },
        Command::Login { nsec } => {
            let keys = keys::parse_secret(&nsec)?;
            KeyStore::store(&keys).await?;
            println!("logged in as {}", keys::npub(&keys.public_key())?);
        }
        Command::Logout => KeyStore::clear().await?,
        Command::Feed { algo, since } => {
            let keys = KeyStore::load().await?;
            let settings = AppSettings::load();
            let app = connect(&settings, Some(keys.clone())).await?;

            let algo_id = algo.or_else(|| settings.default_algorithm.clone());
            let algorithm = resolve_algorithm(&settings, &keys, algo_id.as_deref()).await?;

            let me = keys.public_key().to_hex();
            let follows = app.follows(&me).await?;
            let since = since.map(|secs| events::now().saturating_sub(secs));
            let feed = app.load_feed(&algorithm, &follows, since).await?;
            print_feed(&app, &feed).await?;
        }
        Command::Profile { npub } => {
            let pubkey = keys::pubkey_hex(&npub)?;
            let app = connect(&AppSettings::load(), KeyStore::load().await.ok()).await?;
            let meta = app.profile(&pubkey).await?;

            println!("{}", display_name(meta.as_ref(), &pubkey));
            println!("{}", keys::npub_from_hex(&pubkey)?);
            if let Some(meta) = meta {
                for line in [meta.nip05, meta.website, meta.about].into_iter().flatten() {
                    println!("{}", line);
                }
            }
        }
        Command::Post { text } => {
            let keys = KeyStore::load().await?;
            let app = connect(&AppSettings::load(), Some(keys)).await?;
            let note = app.post(&text).await?;
            println!("{}", keys::note_id_bech32(&note.id)?);
        }
        Command::Cache { action } => match action {
            CacheAction::Cleanup => {
                let keys = KeyStore::load().await?;
                let db = CacheDb::open(&keys.public_key().to_hex())?;
                let removed = db.cleanup_stale()?;
                println!("removed {} stale entries", removed);
            }
        },
    }
    Ok(())
}

/// Open the user's cache and connect to the configured relays.
async fn connect(settings: &AppSettings, keys: Option<Keys>) -> Result<App<RelayPool>, AppError> {
    let cache_user = keys
        .as_ref()
        .map(|k| k.public_key().to_hex())
        .unwrap_or_else(|| "anonymous".to_string());
    let cache = CacheDb::open(&cache_user)?;

    let queue = Arc::new(RequestQueue::new(MAX_CONCURRENT_REQUESTS));
    let pool = RelayPool::connect(keys.clone(), &settings.relays, queue).await?;
    Ok(App::new(pool, cache, keys))
}

async fn resolve_algorithm(
    settings: &AppSettings,
    keys: &Keys,
    id: Option<&str>,
) -> Result<Algorithm, AppError> {
    let following = Algorithm::following();
    let Some(id) = id.filter(|id| *id != following.id) else {
        return Ok(following);
    };

    let api = ApiClient::new(&settings.effective_api_url(), Some(keys.clone()))?;
    let algorithms = api.list_algorithms().await?;
    match algorithms.into_iter().find(|a| a.id == id) {
        Some(algo) => Ok(algo),
        None => {
            tracing::warn!("algorithm {} not found, using Following", id);
            Ok(following)
        }
    }
}

async fn print_feed(app: &App<RelayPool>, feed: &[Note]) -> Result<(), AppError> {
    let authors: Vec<String> = feed.iter().map(|n| n.pubkey.clone()).collect();
    let profiles = app.profiles(&authors).await?;
    let ids: Vec<String> = feed.iter().map(|n| n.id.clone()).collect();
    let counts = app.counts(&ids).await?;
    let now = events::now();

    for note in feed.iter().filter(|n| !n.deleted) {
        let name = display_name(profiles.get(&note.pubkey), &note.pubkey);
        let shown = note.reposted_event.as_deref().unwrap_or(note);
        let header = if note.is_repost() {
            let original = display_name(profiles.get(&shown.pubkey), &shown.pubkey);
            format!("{} reposted {}", name, original)
        } else {
            name
        };

        println!("{} · {}", header, format_relative_time(note.created_at, now));
        println!("  {}", preview(&shown.content, 280));
        if let Some(c) = counts.get(&note.id) {
            println!(
                "  ♥ {}  ↻ {}  ↩ {}",
                format_count(c.reactions),
                format_count(c.reposts),
                format_count(c.replies)
            );
        }
        println!();
    }
    Ok(())
}
