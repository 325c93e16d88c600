use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Parser, ValueEnum};
use directories::BaseDirs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gazpar::sources::{DataSource, ExcelWebDataSource, JsonWebDataSource, TestDataSource};
use gazpar::{Client, Frequency, GazparError, DEFAULT_LAST_N_DAYS};

/// Largest `--last-n-days` accepted (about a century)
const MAX_LAST_N_DAYS: i64 = 36_500;

/// Natural gas consumption from GrDF, as JSON
#[derive(Parser, Debug)]
#[command(name = "gazpar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// GrDF account login
    #[arg(short, long, env = "GRDF_USERNAME")]
    username: Option<String>,

    /// GrDF account password
    #[arg(short, long, env = "GRDF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Meter identifier (defaults to the first meter of the account)
    #[arg(short = 'c', long = "pce", env = "PCE_IDENTIFIER")]
    pce_identifier: Option<String>,

    /// Directory for downloaded spreadsheets
    #[arg(short, long)]
    tmpdir: Option<PathBuf>,

    /// Frequency to load; repeat for several
    #[arg(short, long = "frequency", default_value = "daily")]
    frequencies: Vec<Frequency>,

    /// Number of days to load, ending today
    #[arg(
        short = 'd',
        long,
        default_value_t = DEFAULT_LAST_N_DAYS,
        value_parser = clap::value_parser!(i64).range(0..=MAX_LAST_N_DAYS)
    )]
    last_n_days: i64,

    /// Where readings come from
    #[arg(long, value_enum, default_value_t = DataSourceKind::Json)]
    datasource: DataSourceKind,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DataSourceKind {
    /// GrDF JSON API
    Json,
    /// GrDF spreadsheet downloads
    Excel,
    /// Bundled sample data
    Test,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        init_tracing(self.verbose, self.log_file.as_deref())?;

        let source = self.build_source()?;
        let mut client = Client::new(source);
        info!(source = client.source_name(), "gazpar starting");

        let pce = match &self.pce_identifier {
            Some(pce) => pce.clone(),
            None => client
                .get_pce_identifiers()?
                .into_iter()
                .next()
                .ok_or_else(|| GazparError::Config("no meter found for this account".into()))?,
        };

        let data = client.load_since(&pce, self.last_n_days, Some(self.frequencies.as_slice()));
        client.logout();

        println!("{}", serde_json::to_string_pretty(&data?)?);
        Ok(())
    }

    fn build_source(&self) -> anyhow::Result<Box<dyn DataSource>> {
        if self.datasource == DataSourceKind::Test {
            return Ok(Box::new(TestDataSource::new()));
        }

        let username = self
            .username
            .clone()
            .ok_or_else(|| GazparError::Config("missing --username (or GRDF_USERNAME)".into()))?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| GazparError::Config("missing --password (or GRDF_PASSWORD)".into()))?;

        let source: Box<dyn DataSource> = match self.datasource {
            DataSourceKind::Excel => {
                let tmp_dir = match &self.tmpdir {
                    Some(dir) => dir.clone(),
                    None => default_tmpdir()?,
                };
                fs::create_dir_all(&tmp_dir)?;
                Box::new(ExcelWebDataSource::new(username, password, tmp_dir))
            }
            _ => Box::new(JsonWebDataSource::new(username, password)),
        };
        Ok(source)
    }
}

fn default_tmpdir() -> anyhow::Result<PathBuf> {
    let base_dirs = BaseDirs::new()
        .ok_or_else(|| GazparError::Config("Cannot determine cache directory".into()))?;
    Ok(base_dirs.cache_dir().join("gazpar"))
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
