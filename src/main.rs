use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn};
use tracing_subscriber::EnvFilter;
use xify::{
    Credentials, PollOptions, Xify, XifyConfig, XifyResult, DEFAULT_API_URL, DEFAULT_UPLOAD_URL,
};

#[derive(Debug, Parser)]
#[command(name = "xify", version, about = "Post tweets and media to X")]
struct Cli {
    /// Log destination, truncated on every run
    #[arg(long, env = "XIFY_LOG_FILE", default_value = "storage/logs/xify.log")]
    log_file: PathBuf,

    #[arg(long, env = "XIFY_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[arg(long, env = "XIFY_UPLOAD_URL", default_value = DEFAULT_UPLOAD_URL)]
    upload_url: String,

    /// Stop waiting for media processing after this many seconds
    #[arg(long, value_name = "SECS")]
    max_processing_wait: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the account the credentials belong to
    Whoami,
    /// Post a single tweet
    Tweet {
        #[arg(long)]
        text: Option<String>,
        /// Media file to upload and attach (repeatable, at most four)
        #[arg(long = "media", value_name = "PATH")]
        media: Vec<PathBuf>,
        #[arg(long, value_name = "TWEET_ID")]
        reply_to: Option<String>,
    },
    /// Upload any number of media files and post them as a reply chain
    Thread {
        #[arg(long)]
        text: Option<String>,
        #[arg(long = "media", value_name = "PATH")]
        media: Vec<PathBuf>,
    },
    Delete { tweet_id: String },
    /// Upload a media file and print its media id
    Upload { path: PathBuf },
}

#[tokio::main]
async fn main() -> XifyResult<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_file)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, abandoning media processing wait");
            interrupt.cancel();
        }
    });

    let mut poll = PollOptions::default().cancel_token(cancel);
    if let Some(secs) = cli.max_processing_wait {
        poll = poll.max_wait(Duration::from_secs(secs));
    }

    let config = XifyConfig::default()
        .api_url(cli.api_url)
        .upload_url(cli.upload_url)
        .span(info_span!("xify"));
    let mut xify = Xify::new(config)
        .credentials(Credentials::from_env()?)
        .poll_options(poll);

    let result = run(&mut xify, cli.command).await;
    if let Err(err) = &result {
        error!(error = %err, "xify failed");
    }
    result
}

async fn run(xify: &mut Xify, command: Command) -> XifyResult<()> {
    let identity = xify.authenticate().await?;
    info!(username = %identity.username, "Running command");

    match command {
        Command::Whoami => {
            let identity = xify.session()?.identity();
            println!("@{} ({}) id={}", identity.username, identity.name, identity.id);
        }
        Command::Tweet {
            text,
            media,
            reply_to,
        } => {
            let media_ids = upload_all(xify, &media).await?;
            let tweet_id = xify
                .post_tweet(text.as_deref(), &media_ids, reply_to.as_deref())
                .await?;
            println!("{}", tweet_id);
        }
        Command::Thread { text, media } => {
            let media_ids = upload_all(xify, &media).await?;
            for tweet_id in xify.post_thread(text.as_deref(), &media_ids).await? {
                println!("{}", tweet_id);
            }
        }
        Command::Delete { tweet_id } => {
            let deleted = xify.delete_tweet(&tweet_id).await?;
            println!("{}", if deleted { "deleted" } else { "not deleted" });
        }
        Command::Upload { path } => {
            println!("{}", xify.upload_media(&path).await?);
        }
    }
    Ok(())
}

async fn upload_all(xify: &Xify, paths: &[PathBuf]) -> XifyResult<Vec<String>> {
    let mut media_ids = Vec::with_capacity(paths.len());
    for path in paths {
        media_ids.push(xify.upload_media(path).await?);
    }
    Ok(media_ids)
}

fn init_tracing(log_file: &Path) -> XifyResult<()> {
    if let Some(dir) = log_file.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = File::create(log_file)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .init();

    info!("Tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tweet_accepts_repeated_media() {
        let cli = Cli::try_parse_from([
            "xify",
            "--max-processing-wait",
            "120",
            "tweet",
            "--text",
            "Good evening!",
            "--media",
            "candy.png",
            "--media",
            "sunset.gif",
        ])
        .unwrap();

        assert_eq!(cli.max_processing_wait, Some(120));
        match cli.command {
            Command::Tweet { text, media, reply_to } => {
                assert_eq!(text.as_deref(), Some("Good evening!"));
                assert_eq!(media, vec![PathBuf::from("candy.png"), PathBuf::from("sunset.gif")]);
                assert!(reply_to.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
