use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use framevault::config::{DEFAULT_FPS, DEFAULT_MIME};
use framevault::{pipeline, FramevaultConfig, NoopHook};

/// framevault — store arbitrary files as redundancy-coded 1080p video.
#[derive(Parser)]
#[command(name = "framevault", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file into a video
    Encode {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output video path (.mkv)
        #[arg(short, long)]
        output: String,

        /// Encrypt the file with a password
        #[arg(short, long)]
        password: Option<String>,

        /// Frames per second (default: 30)
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,

        /// Media type recorded in the metadata frame
        #[arg(long, default_value = DEFAULT_MIME)]
        mime: String,
    },

    /// Decode a video back into the original file
    Decode {
        /// Input video path (.mkv)
        #[arg(short, long)]
        input: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Decryption password (required if the file was encrypted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Encode a file, decode it back, and compare hashes
    Verify {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Round-trip through an encryption envelope with this password
        #[arg(short, long)]
        password: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Encode {
            input,
            output,
            password,
            fps,
            mime,
        } => {
            let cfg = FramevaultConfig { fps };
            let report =
                pipeline::encode::encode_file(&input, &output, password.as_deref(), &mime, &cfg)?;
            println!(
                "{}: {} frames ({} source, {} repair)",
                output, report.total_frames, report.source_count, report.repair_count
            );
        }

        Commands::Decode {
            input,
            output,
            password,
        } => {
            let decoded = pipeline::decode::decode_file(&input, &output, password.as_deref())?;
            println!(
                "{} -> {} ({}, {} bytes)",
                input,
                output.display(),
                decoded.name,
                decoded.bytes.len()
            );
        }

        Commands::Verify { input, password } => {
            let workdir = std::env::temp_dir().join(format!("framevault-verify-{}", std::process::id()));
            std::fs::create_dir_all(&workdir)?;
            let encoded = workdir.join("verify.mkv");
            let decoded = workdir.join("verify.out");

            let result = pipeline::roundtrip(
                &input,
                encoded.to_string_lossy().as_ref(),
                &decoded,
                password.as_deref(),
                &FramevaultConfig::default(),
                &NoopHook,
            );
            std::fs::remove_dir_all(&workdir).ok();
            let result = result?;

            println!("original: {}", result.original_hash);
            println!("decoded:  {}", result.decoded_hash);
            if !result.matched {
                anyhow::bail!("round-trip mismatch for {}", input.display());
            }
            println!("round-trip OK");
        }
    }

    Ok(())
}
