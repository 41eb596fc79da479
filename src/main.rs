//! `quantum-echo [--config CONFIG] [IMAGE]`
//!
//! Opens the particle field in a window. With IMAGE the field is driven by
//! that still image; without one, a synthetic moving light stands in for a
//! camera. Pass `-v` (or set `RUST_LOG=info`) for startup details.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use quantum_echo::prelude::*;
use quantum_echo::source::SyntheticSource;

#[derive(Parser, Debug)]
#[command(name = "quantum-echo")]
#[command(about = "Video-driven particle field", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file; defaults apply when omitted
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Still image driving the field instead of the synthetic light
    #[arg(value_name = "IMAGE")]
    image: Option<PathBuf>,

    /// Synthetic source size as WIDTHxHEIGHT
    #[arg(long, value_name = "WxH", default_value = "160x120", value_parser = parse_size)]
    source_size: (u32, u32),

    /// Synthetic source frame rate
    #[arg(long, default_value_t = 30)]
    source_fps: u32,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("'{}' is not a positive integer", s))
    };
    Ok((parse(w)?, parse(h)?))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if cli.verbose > 0 {
        log::set_max_level(match cli.verbose {
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        });
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("quantum-echo: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => EchoConfig::load(path)?,
        None => EchoConfig::default(),
    };

    let field = FieldSlot::new();
    let _source = match &cli.image {
        Some(path) => {
            let frame = VideoFrame::open(path)?;
            log::info!(
                "Field source: {} ({}x{})",
                path.display(),
                frame.width(),
                frame.height()
            );
            field.publish(frame);
            None
        }
        None => {
            let (width, height) = cli.source_size;
            Some(SyntheticSource::spawn(field.clone(), width, height, cli.source_fps))
        }
    };

    quantum_echo::window::run(config, field)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_flag_accepts_any_extension() {
        let cli = Cli::try_parse_from(["quantum-echo", "--config", "settings.cfg"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("settings.cfg")));
        assert_eq!(cli.image, None);

        let cli = Cli::try_parse_from(["quantum-echo", "-c", "config.JSON", "face.png"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("config.JSON")));
        assert_eq!(cli.image, Some(PathBuf::from("face.png")));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["quantum-echo"]).unwrap();
        assert_eq!(cli.config, None);
        assert_eq!(cli.image, None);
        assert_eq!(cli.source_size, (160, 120));
        assert_eq!(cli.source_fps, 30);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_extra_positional_is_rejected() {
        assert!(Cli::try_parse_from(["quantum-echo", "a.png", "b.png"]).is_err());
    }

    #[test]
    fn test_help_is_not_an_image() {
        let err = Cli::try_parse_from(["quantum-echo", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_source_size_parsing() {
        assert_eq!(parse_size("320x240"), Ok((320, 240)));
        assert_eq!(parse_size("64X48"), Ok((64, 48)));
        assert!(parse_size("320").is_err());
        assert!(parse_size("0x240").is_err());
        assert!(parse_size("wide x tall").is_err());
    }
}
