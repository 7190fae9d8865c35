//! # campvoice
//!
//! Command line front end for the campvoiceus forum. Assembles the client from
//! compile-time features: cache backends and the token inspector are plugins.

mod cli;

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{Cli, Command};
use cv_app::{
    notifications, parse_tags, resolve_voters, submit_thread, ProfileStore, Services,
    SessionManager, ThreadDetailStore, ThreadFeed,
};
use cv_config::{CacheBackend, Settings};
use cv_core::{
    Attachment, CacheStore, MemoryCache, NewThread, ProfileUpdate, ReadThroughCache,
    RegisterRequest, Thread, TokenInspector,
};
use cv_http::HttpApi;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// Feature-gated plugins
#[cfg(feature = "cache-sqlite")]
use cv_cache_sqlite::SqliteCacheStore;

#[cfg(feature = "cache-fs")]
use cv_cache_fs::FsCacheStore;

#[cfg(feature = "auth-jwt")]
use cv_auth_jwt::JwtInspector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(&settings);
    debug!(base_url = %settings.api.base_url, backend = ?settings.cache.backend, "configuration loaded");

    // 1. Remote API
    let api = Arc::new(HttpApi::new(&settings.api.base_url, settings.api.timeout())?);

    // 2. Local cache
    let cache = ReadThroughCache::new(open_cache(&settings).await?);

    // 3. State holders share one bundle
    let services = Services::new(api.clone(), api, cache);
    let auth = SessionManager::new(&services, token_inspector());
    if cli.command.needs_session() {
        auth.restore().await?;
    }

    run(cli.command, &settings, &services, &auth).await
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if settings.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_cache(settings: &Settings) -> anyhow::Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match settings.cache.backend {
        #[cfg(feature = "cache-sqlite")]
        CacheBackend::Sqlite => Arc::new(SqliteCacheStore::new(&settings.cache.sqlite_url()).await?),
        #[cfg(feature = "cache-fs")]
        CacheBackend::Fs => Arc::new(FsCacheStore::new(&settings.cache.path)),
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        #[allow(unreachable_patterns)]
        other => bail!("cache backend {other:?} is not compiled into this build"),
    };
    Ok(store)
}

/// Without JWT support the user id always comes from the profile endpoint.
#[cfg(not(feature = "auth-jwt"))]
struct OpaqueTokens;

#[cfg(not(feature = "auth-jwt"))]
impl TokenInspector for OpaqueTokens {
    fn claims(&self, _token: &str) -> Option<cv_core::TokenClaims> {
        None
    }
}

fn token_inspector() -> Arc<dyn TokenInspector> {
    #[cfg(feature = "auth-jwt")]
    {
        Arc::new(JwtInspector::new())
    }
    #[cfg(not(feature = "auth-jwt"))]
    {
        Arc::new(OpaqueTokens)
    }
}

fn read_password(prompt: &str) -> anyhow::Result<SecretString> {
    eprint!("{prompt}: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("no password given");
    }
    Ok(SecretString::from(password))
}

fn read_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime = mime_guess::from_path(path).first_or_octet_stream().to_string();
    Ok(Attachment { file_name, mime, bytes })
}

fn print_threads(threads: &[Thread]) {
    if threads.is_empty() {
        println!("(no threads)");
    }
    for t in threads {
        let author = t.author_name.as_deref().unwrap_or(&t.author_id);
        let tags = if t.tags.is_empty() {
            String::new()
        } else {
            format!("  #{}", t.tags.join(" #"))
        };
        println!(
            "[{:>+4}] {}  {}  by {}  ({} comments){}",
            t.votes.score(),
            t.id,
            t.title,
            author,
            t.comments.len(),
            tags
        );
    }
}

fn print_thread(t: &Thread) {
    println!("{}\n{}", t.title, "=".repeat(t.title.chars().count()));
    println!(
        "by {}  {}  score {:+}",
        t.author_name.as_deref().unwrap_or(&t.author_id),
        t.created_at.format("%Y-%m-%d %H:%M"),
        t.votes.score()
    );
    println!("\n{}\n", t.content);
    if let Some(file) = &t.file {
        println!("attachment: {} <{}>", file.name, file.url);
    }
    for c in &t.comments {
        let who = c.name.as_deref().or(c.user_name.as_deref()).unwrap_or(&c.user_id);
        println!("  [{:>+3}] {} {}: {}", c.votes.score(), c.comment_id, who, c.content);
    }
}

async fn print_feed(feed: ThreadFeed) -> anyhow::Result<()> {
    if let Err(e) = feed.refresh().await {
        let cached = feed.threads();
        if cached.is_empty() {
            return Err(e.into());
        }
        eprintln!("{}  (showing cached threads)", e.user_message());
    }
    print_threads(&feed.threads());
    Ok(())
}

async fn run(
    command: Command,
    settings: &Settings,
    services: &Services,
    auth: &SessionManager,
) -> anyhow::Result<()> {
    match command {
        Command::Login { identifier } => {
            let Some(identifier) = identifier.or_else(|| settings.credentials.identifier.clone()) else {
                bail!("login needs an identifier on the command line or in [credentials]");
            };
            let prompted;
            let password = match &settings.credentials.password {
                Some(p) => p,
                None => {
                    prompted = read_password("password")?;
                    &prompted
                }
            };
            let session = auth.login(&identifier, password).await?;
            info!(user = ?session.user_id, "login complete");
            println!("Logged in as {identifier}.");
        }
        Command::Register { name, username, email } => {
            let password = read_password("choose a password")?;
            let request = RegisterRequest {
                name,
                username,
                email,
                password: password.expose_secret().to_string(),
            };
            let response = auth.register(&request).await?;
            println!("Registered {} <{}>. You can now log in.", response.username, response.email);
        }
        Command::Logout => {
            auth.logout().await?;
            println!("Logged out.");
        }
        Command::Feed => print_feed(ThreadFeed::home(services).await).await?,
        Command::Mine => print_feed(ThreadFeed::user_threads(services).await).await?,
        Command::Tag { tag } => print_feed(ThreadFeed::by_tag(services, &tag).await).await?,
        Command::Author { user_id } => {
            let profile = ProfileStore::open(services).await;
            let user = profile.author(&user_id).await?;
            println!("{} (@{})", user.name, user.username);
            if let Some(bio) = &user.bio {
                println!("{bio}");
            }
            println!();
            print_feed(ThreadFeed::by_author(services, &user_id).await).await?;
        }
        Command::Thread { id } => {
            let detail = ThreadDetailStore::open(services, id);
            detail.refresh().await?;
            if let Some(thread) = detail.thread() {
                print_thread(&thread);
            }
        }
        Command::Vote { thread_id, direction } => {
            let detail = ThreadDetailStore::open(services, thread_id);
            detail.refresh().await?;
            detail.vote_thread(direction).await?;
            if let Some(thread) = detail.thread() {
                println!("{} score {:+}", thread.id, thread.votes.score());
            }
        }
        Command::VoteComment { thread_id, comment_id, direction } => {
            let detail = ThreadDetailStore::open(services, thread_id);
            detail.refresh().await?;
            detail.vote_comment(&comment_id, direction).await?;
            if let Some(c) = detail.thread().as_ref().and_then(|t| t.comment(&comment_id)) {
                println!("{} score {:+}", c.comment_id, c.votes.score());
            }
        }
        Command::Voters { thread_id } => {
            let detail = ThreadDetailStore::open(services, thread_id);
            detail.refresh().await?;
            let Some(thread) = detail.thread() else {
                bail!("thread not found");
            };
            let up = resolve_voters(services, &thread.votes.upvotes).await?;
            let down = resolve_voters(services, &thread.votes.downvotes).await?;
            for (label, voters) in [("up", up), ("down", down)] {
                println!("{label} ({}):", voters.len());
                for v in voters {
                    println!("  {} (@{})", v.name, v.username);
                }
            }
        }
        Command::Comment { thread_id, text } => {
            let detail = ThreadDetailStore::open(services, thread_id);
            detail.add_comment(&text.join(" ")).await?;
            if let Some(thread) = detail.thread() {
                print_thread(&thread);
            }
        }
        Command::Post { title, content, tags, file } => {
            let attachment = file.as_deref().map(read_attachment).transpose()?;
            let draft = NewThread {
                title,
                content,
                tags: tags.as_deref().map(parse_tags).unwrap_or_default(),
                attachment,
            };
            submit_thread(services, draft).await?;
            println!("Thread posted.");
        }
        Command::Profile { name, bio, avatar } => {
            let profile = ProfileStore::open(services).await;
            profile.refresh().await?;
            if name.is_some() || bio.is_some() || avatar.is_some() {
                let current = profile.profile().context("profile unavailable")?;
                let update = ProfileUpdate {
                    name: name.unwrap_or(current.name),
                    bio: bio.or(current.bio),
                    avatar: avatar.as_deref().map(read_attachment).transpose()?,
                };
                profile.update(update).await?;
            }
            if let Some(user) = profile.profile() {
                println!("{} (@{})  {}", user.name, user.username, user.email);
                if let Some(bio) = user.bio {
                    println!("{bio}");
                }
            }
        }
        Command::Notifications => {
            let inbox = notifications(services).await;
            if let Err(e) = inbox.refresh().await {
                eprintln!("{}  (showing cached notifications)", e.user_message());
            }
            let items = inbox.items();
            if items.is_empty() {
                println!("(no notifications)");
            }
            for n in items {
                let link = n.thread_id.map(|t| format!("  -> {t}")).unwrap_or_default();
                println!("{}: {}{}", n.title, n.message, link);
            }
        }
        Command::PushToken { token } => {
            auth.update_push_token(&token).await?;
            println!("Push token stored.");
        }
    }
    Ok(())
}
