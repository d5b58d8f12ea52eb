use std::fs;
use std::io::{self, BufRead as _};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde_json::json;

use vantage::{Bridge, CpuEngine, JsonSceneDecoder};

#[derive(Parser, Debug)]
#[command(name = "vantage", version)]
struct Cli {
    /// Log every request and response to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer JSON commands from stdin, one request per line.
    Serve(ServeArgs),
    /// Load a scene document and write one rendered frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Scene bytes staged for loadScene, as ADDR=PATH (repeatable).
    #[arg(long = "stage", value_parser = parse_stage)]
    stage: Vec<(u64, PathBuf)>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Target width in pixels.
    #[arg(long, default_value_t = 256)]
    width: u32,

    /// Target height in pixels.
    #[arg(long, default_value_t = 256)]
    height: u32,
}

fn parse_stage(raw: &str) -> Result<(u64, PathBuf), String> {
    let (addr, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=PATH, got '{raw}'"))?;
    let addr = if let Some(hex) = addr.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        addr.parse()
    }
    .map_err(|_| format!("bad staging address '{addr}'"))?;
    Ok((addr, PathBuf::from(path)))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(io::stderr)
        .init();

    match cli.cmd {
        Command::Serve(args) => cmd_serve(args, cli.verbose),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn cmd_serve(args: ServeArgs, verbose: bool) -> anyhow::Result<()> {
    let mut decoder = JsonSceneDecoder::new();
    for (addr, path) in &args.stage {
        let bytes =
            fs::read(path).with_context(|| format!("read staged scene '{}'", path.display()))?;
        decoder.stage(*addr, bytes);
    }

    let mut bridge = Bridge::new(Box::new(decoder), Box::new(CpuEngine::new()));
    if verbose {
        bridge.call(json!({ "cmd": "init", "verbose": true }).to_string());
    }

    for line in io::stdin().lock().lines() {
        let line = line.context("read request line")?;
        if line.trim().is_empty() {
            continue;
        }
        println!("{}", bridge.call(line));
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let bytes = fs::read(&args.in_path)
        .with_context(|| format!("read scene document '{}'", args.in_path.display()))?;
    let size = bytes.len();

    const STAGE_ADDR: u64 = 0x10_0000;
    let mut decoder = JsonSceneDecoder::new();
    decoder.stage(STAGE_ADDR, bytes);

    let mut bridge = Bridge::new(Box::new(decoder), Box::new(CpuEngine::new()));
    let requests = [
        json!({ "cmd": "init" }),
        json!({ "cmd": "loadScene", "name": "scene", "dataPointer": STAGE_ADDR, "size": size }),
        json!({
            "cmd": "render",
            "target": { "targetIndex": 0, "width": args.width, "height": args.height },
            "desc": { "sceneName": "scene" },
        }),
        json!({ "cmd": "getPixels", "targetIndex": 0, "width": args.width, "height": args.height }),
    ];
    for request in requests {
        let response = bridge.call(request.to_string());
        let value: serde_json::Value =
            serde_json::from_str(&response).context("parse bridge response")?;
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            anyhow::bail!("viewer call failed: {error}");
        }
    }

    if let Some(parent) = args.out.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let required = args.width as usize * args.height as usize * 4;
    image::save_buffer_with_format(
        &args.out,
        &bridge.pixel_data()[..required],
        args.width,
        args.height,
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
