use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_digest::cli::{Cli, Commands};
use video_digest::config::Config;
use video_digest::pipeline::{Pipeline, ProcessRequest};
use video_digest::platform::ProfileRegistry;
use video_digest::{output, tools, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "video_digest=debug"
    } else if cli.quiet {
        "video_digest=warn"
    } else {
        "video_digest=info"
    };

    // Initialize tracing; logs go to stderr so stdout stays for results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Process {
            url,
            alias,
            platform,
            output_dir,
        } => {
            let mut config = Config::load().await?;
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }

            // Check for required external tools (non-fatal, paths may still resolve)
            let missing_deps = utils::check_dependencies(&config).await;
            if !missing_deps.is_empty() {
                eprintln!("Dependency check warnings:");
                for dep in missing_deps {
                    eprintln!("   - {}", dep);
                }
                eprintln!("   (Continuing anyway - run `video-digest verify` for details)");
            }

            let pipeline = Pipeline::from_config(config)?.with_progress(!cli.quiet);
            let request = ProcessRequest::new(url)
                .with_alias(alias)
                .with_platform(platform);

            let outcome = pipeline.process(&request).await?;
            output::print_summary(&outcome);
        }
        Commands::Verify => {
            let config = Config::load().await?;
            let checks = tools::verify_toolchain(&config).await;
            if !output::print_verify_report(&checks) {
                std::process::exit(1);
            }
        }
        Commands::Platforms => {
            let registry = match Config::load().await {
                Ok(config) => ProfileRegistry::from_config(&config)?,
                Err(e) => {
                    tracing::warn!("Using built-in profiles: {:#}", e);
                    ProfileRegistry::new()?
                }
            };
            println!("{}", output::format_platforms(&registry));
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!("Edit it to change tool paths, the Whisper model or keyframe intervals.");
                println!("Run with --show to print the current values.");
            }
        }
    }

    Ok(())
}
