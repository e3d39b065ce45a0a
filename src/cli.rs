use crate::utils::Result;
use clap::{ArgAction, ArgGroup, Parser, Subcommand, ValueEnum};
use log::{Level, LevelFilter};
use owo_colors::{
    colors::{Blue, Green, Magenta, Red, Yellow},
    OwoColorize, Stream, Style,
};
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub const FULL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name="pecat",
          version=FULL_VERSION,
          about="Prime editing outcome classifier for twin-pegRNA amplicon sequencing",
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Enable or disable color output in logging
    #[arg(long, value_enum, default_value_t = Color::Auto, global = true, help_heading = "Advanced")]
    color: Color,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Read-by-read outcome classification")]
    Classify(ClassifyArgs),
    #[clap(about = "Target annotation validator")]
    Validate(ValidateArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Classify(_) => "classify",
            Command::Validate(_) => "validate",
        }
    }
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("classify")))]
#[command(arg_required_else_help(true))]
pub struct ClassifyArgs {
    /// SAM/BAM file with read alignments, grouped by read name
    #[arg(
        short = 'a',
        long = "alignments",
        value_name = "ALIGNMENTS",
        required = true
    )]
    pub alignments_path: PathBuf,

    /// JSON file describing the target, pegRNAs and reference features
    #[arg(
        short = 'n',
        long = "annotation",
        value_name = "ANNOTATION",
        required = true
    )]
    pub annotation_path: PathBuf,

    /// Output TSV file with one classification per read
    #[arg(
        short = 'o',
        long = "output",
        value_name = "OUTPUT",
        value_parser = check_prefix_path,
        required = true
    )]
    pub output_path: PathBuf,

    /// Number of threads
    #[arg(
        short = 't',
        long = "threads",
        value_name = "THREADS",
        default_value = "1",
        value_parser = threads_in_range
    )]
    pub num_threads: usize,

    /// Buffer size for the read group channel
    #[arg(
        long = "group-channel-buffer",
        value_name = "SIZE",
        default_value = "512",
        help_heading = "Advanced IO",
        hide = true
    )]
    pub group_channel_buffer_size: usize,

    /// Buffer size for the results channel
    #[arg(
        long = "result-channel-buffer",
        value_name = "SIZE",
        default_value = "2048",
        help_heading = "Advanced IO",
        hide = true
    )]
    pub result_channel_buffer_size: usize,
}

impl ClassifyArgs {
    pub fn preflight(&self) -> Result<()> {
        check_file_exists(&self.alignments_path)?;
        check_file_exists(&self.annotation_path)
    }
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("validate")))]
#[command(arg_required_else_help(true))]
pub struct ValidateArgs {
    /// JSON file describing the target, pegRNAs and reference features
    #[arg(
        short = 'n',
        long = "annotation",
        value_name = "ANNOTATION",
        required = true
    )]
    pub annotation_path: PathBuf,
}

impl ValidateArgs {
    pub fn preflight(&self) -> Result<()> {
        check_file_exists(&self.annotation_path)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Color {
    Always,
    Auto,
    Never,
}

impl Color {
    fn apply(self) {
        match self {
            Color::Always => owo_colors::set_override(true),
            Color::Auto => {}
            Color::Never => owo_colors::set_override(false),
        }
    }
}

pub fn init_verbose(args: &Cli) {
    args.color.apply();

    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(format_log)
        .filter_level(filter_level)
        .init();
}

#[inline(always)]
fn level_style(level: Level) -> (&'static str, Style) {
    match level {
        Level::Error => ("ERROR", Style::new().fg::<Red>().bold()),
        Level::Warn => ("WARN", Style::new().fg::<Yellow>()),
        Level::Info => ("INFO", Style::new().fg::<Green>()),
        Level::Debug => ("DEBUG", Style::new().fg::<Blue>()),
        Level::Trace => ("TRACE", Style::new().fg::<Magenta>()),
    }
}

fn format_log(buf: &mut env_logger::fmt::Formatter, record: &log::Record) -> std::io::Result<()> {
    let (label, style) = level_style(record.level());
    let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let painted_label = label.if_supports_color(Stream::Stderr, |t| style.style(t));
    writeln!(buf, "{ts} [{}] - {}", painted_label, record.args())
}

fn check_prefix_path(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(PathBuf::from(s))
}

fn check_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(format!("File does not exist: {}", path.display()));
    }
    Ok(())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread_count: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread count", s))?;
    if thread_count == 0 {
        return Err("Number of threads must be at least 1".to_string());
    }
    Ok(thread_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_count_must_be_positive() {
        assert!(threads_in_range("0").is_err());
        assert!(threads_in_range("x").is_err());
        assert_eq!(threads_in_range("4").unwrap(), 4);
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
