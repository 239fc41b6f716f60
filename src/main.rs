//! Lady Flamme - Operator CLI
//!
//! Inspects the progression curve, simulates players, and runs maintenance
//! against the user store.

use std::fs::OpenOptions;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Duration, TimeZone, Utc};
use clap::{Parser, Subcommand};

use lady_flamme::clock::{Clock, ManualClock, SystemClock};
use lady_flamme::config::{Settings, DEFAULT_SETTINGS_PATH};
use lady_flamme::economy::Shop;
use lady_flamme::leaderboard::{Leaderboard, LeaderboardEntry, Page};
use lady_flamme::maintenance::{recalculate_levels, restore_xp};
use lady_flamme::notify::{LogSink, RecordingSink};
use lady_flamme::progression::milestones::MILESTONE_MAX_LEVEL;
use lady_flamme::progression::{bonus_for, level_progress, progress_bar, ProgressionCurve};
use lady_flamme::store::{FlushLoop, JsonFileStore, MemoryStore, UserStore, WriteBackCache};
use lady_flamme::{build_curve, MessageEvent, ProgressionSession, UserId};

#[derive(Parser)]
#[command(name = "lady-flamme")]
#[command(version, about = "Lady Flamme - XP progression for Discord communities")]
struct Cli {
    /// Settings file
    #[arg(short, long, default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the XP table
    Curve {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play simulated members against the curve
    Simulate {
        /// Days to simulate
        #[arg(short, long, default_value = "30")]
        days: u32,
        /// Messages per member per day, one per cooldown
        #[arg(short, long, default_value = "10")]
        messages: u32,
        /// Number of members
        #[arg(short, long, default_value = "1")]
        users: u64,
    },

    /// Feed chat lines from stdin (`<user id> <name> <message>`) through a live session.
    /// Lines `!top [page]`, `!rank <user id>` and `!reset` query the leaderboard.
    Chat,

    /// Show a page of the leaderboard
    Leaderboard {
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,
        /// Entries per page (50, 100 or 200)
        #[arg(long)]
        per_page: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one member's level and progress
    Rank {
        user: UserId,
    },

    /// Re-derive every stored level from the current curve
    Recalc {
        /// Report changes without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Set a member's XP total by hand
    Restore {
        user: UserId,
        xp: u64,
        #[arg(long)]
        nick: Option<String>,
    },

    /// List the shop catalog
    Shop,

    /// Buy an item for a member
    Buy {
        user: UserId,
        item: String,
    },

    /// Print the effective settings as RON
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    log::info!("Starting Lady Flamme v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(&cli.config)?;
    let curve = Arc::new(build_curve(&settings.curve_params()).context("invalid curve configuration")?);

    match cli.command {
        Commands::Curve { json } => print_curve(&curve, json),
        Commands::Simulate { days, messages, users } => simulate(&settings, curve, days, messages, users),
        Commands::Chat => chat(&settings, curve),
        Commands::Leaderboard { page, per_page, json } => {
            let board = open_leaderboard(&settings, curve)?;
            let per_page = per_page.unwrap_or(settings.leaderboard.default_per_page);
            let page = board.page(Utc::now(), page, per_page)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
                return Ok(());
            }
            print_page(&page);
            Ok(())
        }
        Commands::Rank { user } => {
            let board = open_leaderboard(&settings, Arc::clone(&curve))?;
            let ranking = board.ranking(Utc::now())?;
            let Some(entry) = ranking.iter().find(|e| e.user_id == user) else {
                bail!("user {} has no progress yet", user);
            };
            print_rank(&curve, entry, ranking.len());
            Ok(())
        }
        Commands::Recalc { dry_run } => {
            let store = open_store(&settings)?;
            let report = recalculate_levels(store.as_ref(), &curve, dry_run)?;
            for change in &report.changes {
                println!("user {}: level {} -> {}", change.user_id, change.old_level, change.new_level);
            }
            println!(
                "{} users scanned, {} levels {}",
                report.scanned,
                report.changes.len(),
                if dry_run { "would change" } else { "changed" }
            );
            Ok(())
        }
        Commands::Restore { user, xp, nick } => {
            let store = open_store(&settings)?;
            let level = restore_xp(store.as_ref(), &curve, user, xp, nick.as_deref())?;
            println!("user {} restored to {} XP (level {})", user, xp, level);
            Ok(())
        }
        Commands::Shop => {
            for item in settings.shop.items() {
                println!("{:<10} {:<14} {:>7} Ignis  {}", item.key, item.name, item.price, item.description);
            }
            Ok(())
        }
        Commands::Buy { user, item } => {
            let store = open_store(&settings)?;
            let cache = Arc::new(WriteBackCache::new(store));
            let shop = Shop::new(settings.shop.clone(), Arc::clone(&cache));
            let receipt = shop.purchase(user, &item)?;

            let report = cache.flush();
            if report.failed > 0 {
                bail!("purchase could not be saved");
            }
            println!(
                "user {} bought {} for {} Ignis, {} left",
                receipt.user_id, receipt.item, receipt.price, receipt.balance_after
            );
            Ok(())
        }
        Commands::Config => {
            println!("{}", settings.to_ron_pretty()?);
            Ok(())
        }
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    // Quiet on the terminal, verbose into a file
    let default_filter = if log_file.is_some() { "info" } else { "warn" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open log file {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn open_store(settings: &Settings) -> Result<Arc<dyn UserStore>> {
    let path = settings.store_path();
    let store = JsonFileStore::open(&path).with_context(|| format!("cannot open user store {:?}", path))?;
    Ok(Arc::new(store))
}

fn open_leaderboard(settings: &Settings, curve: Arc<ProgressionCurve>) -> Result<Leaderboard> {
    let users = Arc::new(WriteBackCache::new(open_store(settings)?));
    Ok(Leaderboard::new(curve, users, settings.leaderboard_ttl()))
}

fn print_page(page: &Page) {
    println!("Leaderboard page {}/{} ({} members)", page.page, page.pages, page.total);
    for entry in &page.entries {
        println!(
            "{:>4}. {:<24} level {:>3} ({:>3}%)  {:>9} XP  {:>7} Ignis",
            entry.rank, entry.name, entry.level, entry.percent, entry.xp, entry.coins
        );
    }
}

fn print_rank(curve: &ProgressionCurve, entry: &LeaderboardEntry, members: usize) {
    let (current, needed) = level_progress(curve, entry.xp);
    println!("{} - rank #{} of {}", entry.name, entry.rank, members);
    println!("Level {} {} {}/{} XP", entry.level, progress_bar(current, needed, 20), current, needed);
    println!("Total {} XP, {} Ignis", entry.xp, entry.coins);
}

fn print_curve(curve: &ProgressionCurve, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(curve.thresholds())?);
        return Ok(());
    }

    let daily = curve.daily_reference_xp().max(1) as f64;
    println!("Reference day: {} XP", curve.daily_reference_xp());
    println!("{:>5} {:>10} {:>9} {:>7} {:>6}", "level", "total", "cost", "days", "bonus");
    for level in 1..=curve.max_level() {
        let total = curve.threshold(level).unwrap_or_default();
        let cost = curve.required_for(level).unwrap_or_default();
        let bonus = if level <= MILESTONE_MAX_LEVEL { bonus_for(level) } else { 0 };
        println!(
            "{:>5} {:>10} {:>9} {:>7.1} {:>6}",
            level,
            total,
            cost,
            total as f64 / daily,
            bonus
        );
    }
    Ok(())
}

fn simulate(settings: &Settings, curve: Arc<ProgressionCurve>, days: u32, messages: u32, users: u64) -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(WriteBackCache::new(store));
    let sink = Arc::new(RecordingSink::new());
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
        .single()
        .context("invalid simulation start")?;
    let clock = Arc::new(ManualClock::new(start));

    let rules = settings.gain_rules();
    let session = ProgressionSession::new(curve, rules, Arc::clone(&cache), sink.clone(), clock.clone())
        .with_min_len(settings.xp.min_len);

    // Keep every message of a day inside that day
    let spacing = rules.cooldown_secs.max(1);
    let messages = messages.min(((16 * 3600) / spacing) as u32);

    for day in 0..days {
        clock.set(start + Duration::days(i64::from(day)));
        for _ in 0..messages {
            for user_id in 1..=users {
                let name = format!("Member {}", user_id);
                session.handle_message(&MessageEvent::text(user_id, &name, "simulated chat message"))?;
            }
            clock.advance(Duration::seconds(spacing));
        }

        let user = cache.get(1)?;
        println!(
            "day {:>4}  level {:>3}  {:>9} XP  {:>7} Ignis",
            day + 1,
            user.level,
            user.xp,
            user.coins
        );
    }

    cache.flush();
    println!(
        "{} level ups, {} Ignis paid in milestone bonuses",
        sink.events().len(),
        sink.total_bonus()
    );
    Ok(())
}

fn chat(settings: &Settings, curve: Arc<ProgressionCurve>) -> Result<()> {
    let cache = Arc::new(WriteBackCache::new(open_store(settings)?));
    let clock = Arc::new(SystemClock);
    let session = ProgressionSession::new(
        Arc::clone(&curve),
        settings.gain_rules(),
        Arc::clone(&cache),
        Arc::new(LogSink),
        clock.clone(),
    )
    .with_min_len(settings.xp.min_len);
    let board = Leaderboard::new(curve, Arc::clone(&cache), settings.leaderboard_ttl());
    let flush = FlushLoop::spawn(Arc::clone(&cache), clock.clone(), settings.flush_interval())?;

    // Stop the flush loop even if a line fails, so its final flush runs
    let result = feed_lines(&session, &board, clock.as_ref(), settings.leaderboard.default_per_page);
    flush.stop();
    result
}

fn feed_lines(session: &ProgressionSession, board: &Leaderboard, clock: &dyn Clock, per_page: usize) -> Result<()> {
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if let Some(command) = line.strip_prefix('!') {
            run_chat_command(session, board, clock, per_page, command)?;
            continue;
        }

        let mut parts = line.splitn(3, char::is_whitespace);
        let (Some(id), Some(name), content) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let Ok(user_id) = id.parse::<UserId>() else {
            log::warn!("Skipping line with bad user id: {:?}", id);
            continue;
        };

        let event = MessageEvent::text(user_id, name, content.unwrap_or_default());
        if let Some(outcome) = session.handle_message(&event)? {
            println!(
                "{}: +{} XP, +{} Ignis{}",
                name,
                outcome.xp_gain,
                outcome.currency_gain(),
                outcome
                    .new_level()
                    .map(|level| format!(", now level {}", level))
                    .unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn run_chat_command(
    session: &ProgressionSession,
    board: &Leaderboard,
    clock: &dyn Clock,
    per_page: usize,
    command: &str,
) -> Result<()> {
    let mut args = command.split_whitespace();
    match args.next() {
        Some("top") => {
            let page = args.next().and_then(|p| p.parse().ok()).unwrap_or(1);
            print_page(&board.page(clock.now(), page, per_page)?);
        }
        Some("rank") => {
            let Some(user_id) = args.next().and_then(|id| id.parse::<UserId>().ok()) else {
                println!("usage: !rank <user id>");
                return Ok(());
            };
            let ranking = board.ranking(clock.now())?;
            match ranking.iter().find(|e| e.user_id == user_id) {
                Some(entry) => print_rank(session.curve(), entry, ranking.len()),
                None => println!("user {} has no progress yet", user_id),
            }
        }
        Some("reset") => {
            let report = board.reset();
            println!(
                "cache reset: {} users saved, {} left unsaved, {} evicted",
                report.flush.written, report.flush.failed, report.evicted
            );
        }
        _ => println!("unknown command: !{}", command),
    }
    Ok(())
}
