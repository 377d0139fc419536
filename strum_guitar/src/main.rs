//! strum_guitar: interactive entry point.

use clap::Parser;
use strum_guitar::app::run;
use strum_guitar::cli::Args;
use strum_guitar::config::{AppConfig, SourceKind};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // stdout carries the report stream; everything human-facing goes to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    eprintln!();
    eprintln!("╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║        Strum Guitar — hand-tracked chord strumming           ║");
    eprintln!("╚══════════════════════════════════════════════════════════════╝");
    eprintln!();

    let mut cfg = AppConfig::load_or_default(&args.config)?;
    args.apply(&mut cfg);

    match cfg.source.kind {
        SourceKind::Sim => {
            eprintln!("  Source: mouse simulation  (Space = thumb up, Q = quit)");
        }
        SourceKind::Replay => {
            let file = cfg.source.replay.as_ref().map(|p| p.display().to_string());
            eprintln!("  Source: replay {}", file.as_deref().unwrap_or("<none>"));
        }
        SourceKind::Leap => {
            #[cfg(feature = "leap")]
            eprintln!("  Source: LeapMotion hardware");
            #[cfg(not(feature = "leap"))]
            eprintln!("  Source: LeapMotion  (not built in; use --features leap)");
        }
    }
    eprintln!("  Samples: {}", cfg.playback.samples_dir.display());
    eprintln!();

    run(cfg)?;
    Ok(())
}
