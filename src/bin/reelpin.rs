use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "reelpin", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve `GET /` render-and-publish requests.
    Serve(ServeArgs),
    /// Render a video and still locally, without publishing or caching (requires `ffmpeg`).
    Render(RenderArgs),
    /// Print the fingerprint (cache key) of a parameter set.
    Fingerprint(FingerprintArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    cfg: reelpin::Config,
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Scene parameter as `name=value` (repeatable).
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Directory to copy `out.mp4` and `out.png` into.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    cfg: reelpin::Config,
}

#[derive(clap::Args, Debug)]
struct FingerprintArgs {
    /// Scene parameter as `name=value` (repeatable).
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    if name.is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    reelpin::telemetry::init_tracing()?;

    match cli.cmd {
        Command::Serve(args) => reelpin::server::serve(&args.cfg).await,
        Command::Render(args) => cmd_render(args).await,
        Command::Fingerprint(args) => {
            println!(
                "{}",
                reelpin::RenderRequest::from_pairs(args.params).fingerprint()
            );
            Ok(())
        }
    }
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    args.cfg.validate()?;
    let producer = reelpin::pipeline::producer_from_config(&args.cfg)?;
    let request = reelpin::RenderRequest::from_pairs(args.params);
    eprintln!("fingerprint {}", request.fingerprint());

    let produced = producer.produce(&request, reelpin::Needs::ALL).await?;
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    for artifact in produced.video.iter().chain(produced.still.iter()) {
        let dest = args.out.join(artifact.file_name());
        std::fs::copy(artifact.path(), &dest)
            .with_context(|| format!("copy to '{}'", dest.display()))?;
        eprintln!("wrote {}", dest.display());
    }
    Ok(())
}
