use csvtape::{convert, ParseOptions, TapeError};
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("csvtape=warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> csvtape::Result<()> {
    let options = options_from_env()?;

    let input: Box<dyn Read> = match env::args_os().nth(1) {
        Some(path) => {
            tracing::debug!(path = ?path, "reading input file");
            Box::new(File::open(path)?)
        }
        None => Box::new(io::stdin().lock()),
    };

    let stdout = io::stdout();
    let mut output = BufWriter::new(stdout.lock());
    convert(input, &mut output, options)?;
    Ok(())
}

/// `CSVTAPE_BUFFER_SIZE` and `CSVTAPE_STRICT` override the defaults
fn options_from_env() -> csvtape::Result<ParseOptions> {
    let mut options = ParseOptions::default();

    if let Ok(size) = env::var("CSVTAPE_BUFFER_SIZE") {
        let size = size
            .parse()
            .map_err(|_| TapeError::Config(format!("CSVTAPE_BUFFER_SIZE is not a size: {}", size)))?;
        options = options.buffer_size(size);
    }

    if let Ok(strict) = env::var("CSVTAPE_STRICT") {
        let strict = match strict.as_str() {
            "1" | "true" => true,
            "0" | "false" => false,
            other => {
                return Err(TapeError::Config(format!(
                    "CSVTAPE_STRICT must be true or false, got {}",
                    other
                )))
            }
        };
        options = options.strict(strict);
    }

    Ok(options)
}
