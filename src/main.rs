//! Command-line entry point for catalog maintenance.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ilof_catalog::captions::{CaptionClient, Transcript};
use ilof_catalog::config::{self, Config};
use ilof_catalog::episode::{self, Episode};
use ilof_catalog::feed::{self, AudioEpisode};
use ilof_catalog::pipeline::{Override, UpdateOptions, Updater};
use ilof_catalog::poller::{PollMode, Poller, SystemClock, TokioSleeper};
use ilof_catalog::site::SiteClient;
use ilof_catalog::social::{SearchClient, UpdateFinder};
use ilof_catalog::video::VideoClient;
use ilof_catalog::{links, repo, scan};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ilof")]
#[command(about = "Keep the In Lieu of Fun episode catalog up to date")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ilof.yaml, then the user config dir)
    #[arg(long, global = true, env = "ILOF_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create episode files for new announcements
    Update(UpdateArgs),

    /// List audio episodes not yet recorded in the episode log
    Audio {
        /// Print the audio feed as JSON and exit
        #[arg(long, conflicts_with = "log_missing")]
        json_feed: bool,

        /// Print episodes lacking an audio link as JSON and exit
        #[arg(long)]
        log_missing: bool,
    },

    /// Assign seasons to episode files that lack one
    Seasons {
        /// Episodes directory
        #[arg(long)]
        dir: PathBuf,
    },

    /// Print the captions for a video as JSON
    Captions {
        /// Video ID
        #[arg(long, conflicts_with = "episode", required_unless_present = "episode")]
        id: Option<String>,

        /// Episode label; its video is used
        #[arg(long)]
        episode: Option<String>,
    },
}

#[derive(Args)]
struct UpdateArgs {
    /// Do not create or modify any files
    #[arg(long)]
    dry_run: bool,

    /// Create updates even if the files exist
    #[arg(long)]
    force: bool,

    /// Edit new or modified files after update
    #[arg(long)]
    edit: bool,

    /// When to stop polling
    #[arg(long, value_enum, default_value_t = PollMode::Once)]
    mode: PollMode,

    /// Override latest episode with NUM[:YYYY-MM-DD]
    #[arg(long = "override")]
    override_latest: Option<Override>,

    /// Process updates even when no video ID is found
    #[arg(long)]
    skip_video_check: bool,

    /// Check that the origin remote names this repository ("" to skip)
    #[arg(long)]
    check_repo: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    ilof_catalog::init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let cfg = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Update(args) => cmd_update(&cfg, args).await,
        Commands::Audio {
            json_feed,
            log_missing,
        } => cmd_audio(&cfg, json_feed, log_missing).await.map(|_| 0),
        Commands::Seasons { dir } => {
            let n = episode::assign_seasons(&dir)
                .with_context(|| format!("assigning seasons in {}", dir.display()))?;
            log::info!("Assigned seasons to {} episodes", n);
            Ok(0)
        }
        Commands::Captions { id, episode } => cmd_captions(&cfg, id, episode).await.map(|_| 0),
    }
}

async fn cmd_update(cfg: &Config, args: UpdateArgs) -> Result<u8> {
    let token = config::twitter_token()?;
    let api_key = config::youtube_api_key()?;

    let check = args.check_repo.as_deref().unwrap_or(&cfg.check_repo);
    repo::ensure_repo(check)?;

    let schedule = cfg.schedule()?;
    let sunday = schedule.mystery_guest_sunday(chrono::Utc::now());
    if sunday.is_sunday {
        log::info!("It is mystery guest Sunday; {} has the guest this week", sunday.host);
    }

    let finder = UpdateFinder::new(SearchClient::new(token), cfg.query_spec(), cfg.known_handles());
    let opts = UpdateOptions {
        dry_run: args.dry_run,
        force: args.force,
        skip_video_check: args.skip_video_check,
        edit: args.edit,
        override_latest: args.override_latest,
        episode_dir: cfg.episode_dir.clone(),
        guest_file: cfg.guest_file.clone(),
        tag_rules: cfg.tag_rules.clone(),
    };
    let mut updater = Updater::new(
        SiteClient::new(&cfg.site_url),
        finder,
        VideoClient::new(api_key),
        SystemClock,
        opts,
    );

    let poller = Poller::new(args.mode, schedule, SystemClock, TokioSleeper);
    let status = poller.run(&mut updater).await?;
    Ok(status.code())
}

#[derive(Serialize)]
struct FeedDump<'a> {
    episodes: &'a [AudioEpisode],
}

#[derive(Serialize)]
struct MissingDump<'a> {
    missing: Vec<&'a Episode>,
}

#[derive(Serialize)]
struct TranscriptDump {
    transcript: Transcript,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_audio(cfg: &Config, json_feed: bool, log_missing: bool) -> Result<()> {
    let audio = feed::load_audio_feed(&cfg.feed_url)
        .await
        .context("loading audio feed")?;
    log::info!("Loaded {} audio episodes", audio.len());
    if json_feed {
        return print_json(&FeedDump { episodes: &audio });
    }

    let eps = SiteClient::new(&cfg.site_url)
        .all_episodes()
        .await
        .context("loading episodes")?;
    log::info!("Loaded {} episodes", eps.len());
    if log_missing {
        return print_json(&MissingDump {
            missing: scan::missing_audio(&eps),
        });
    }

    let leftovers = scan::unrecorded_audio(&audio, &eps);
    print!("{}", scan::render_leftovers(&leftovers)?);
    Ok(())
}

async fn cmd_captions(cfg: &Config, id: Option<String>, episode: Option<String>) -> Result<()> {
    let video_id = match (id, episode) {
        (Some(id), _) => id,
        (None, Some(label)) => {
            let ep = SiteClient::new(&cfg.site_url)
                .episode(&label)
                .await
                .with_context(|| format!("looking up episode {}", label))?;
            match links::youtube_video_id(&ep.youtube_url) {
                Some(id) => id,
                None => bail!("episode {} has no video link", label),
            }
        }
        (None, None) => bail!("either --id or --episode is required"),
    };

    let client = CaptionClient::new();
    let Some(url) = client.caption_url(&video_id).await? else {
        bail!("video {} has no captions", video_id);
    };
    let transcript = client.transcript(&video_id, &url).await?;
    print_json(&TranscriptDump { transcript })
}
