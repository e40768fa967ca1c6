use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use datestamp::config::{ConverterOptions, RunConfig};
use datestamp::logging::{create_output_writer, init_tracing};
use datestamp::{DateLike, DatePatternConverter, NamedFormat};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::SystemTime;

/// datestamp: format epoch milliseconds the way a log layout's date token does
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Named format (see --list-formats) or a literal pattern such as "HH:mm:ss.SSS"
    #[arg(short, long)]
    format: Option<String>,

    /// Time zone for calendar patterns (UTC, Europe/Berlin, GMT+02:00). Default: local
    #[arg(short = 'z', long)]
    timezone: Option<String>,

    /// Format each timestamp from this many threads sharing one converter
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Append output to this file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List the named formats and exit
    #[arg(long)]
    list_formats: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Epoch milliseconds or "now"; read one per line from stdin if omitted
    timestamps: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.list_formats {
        print_formats();
        return Ok(());
    }

    let config = RunConfig {
        converter: ConverterOptions {
            format: args.format,
            time_zone: args.timezone,
        },
        threads: args.threads.max(1),
        output: args.output,
    };

    for line in settings_lines(&config) {
        println!("{line}");
    }

    let converter = DatePatternConverter::new(&config.converter.as_options());
    tracing::debug!(?converter, "converter ready");
    let mut writer = create_output_writer(config.output.as_ref())?;

    if args.timestamps.is_empty() {
        process_lines(io::stdin().lock(), &converter, config.threads, &mut writer)?;
    } else {
        for raw in &args.timestamps {
            let millis = parse_timestamp(raw)?;
            emit(&converter, millis, config.threads, &mut writer)?;
        }
    }

    writer.flush().context("Failed to flush output")?;
    Ok(())
}

fn settings_lines(config: &RunConfig) -> Vec<String> {
    let mut lines = vec![format!("Format: {}", config.converter.describe())];
    if config.threads > 1 {
        lines.push(format!("Threads per timestamp: {}", config.threads));
    }
    lines
}

fn print_formats() {
    println!("Named formats:");
    for named in NamedFormat::ALL {
        match named.pattern() {
            Some(pattern) => println!("  {:<14} {pattern}", named.token()),
            None => println!("  {:<14} (epoch number)", named.token()),
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<i64> {
    if raw.eq_ignore_ascii_case("now") {
        return Ok(SystemTime::now().epoch_millis());
    }
    raw.parse::<i64>()
        .with_context(|| format!("Not an epoch millisecond value: '{raw}'"))
}

/// One timestamp per line; blank lines are skipped.
fn process_lines<R: BufRead, W: Write + ?Sized>(
    reader: R,
    converter: &DatePatternConverter,
    threads: usize,
    writer: &mut W,
) -> Result<()> {
    for (n, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read stdin")?;
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }
        let millis = parse_timestamp(raw).with_context(|| format!("stdin line {}", n + 1))?;
        emit(converter, millis, threads, writer)?;
    }
    Ok(())
}

fn emit<W: Write + ?Sized>(
    converter: &DatePatternConverter,
    millis: i64,
    threads: usize,
    writer: &mut W,
) -> Result<()> {
    let text = format_shared(converter, millis, threads)?;
    writeln!(writer, "{text}").context("Failed to write output")
}

// Every thread formats the same timestamp through the shared cache; they must agree.
fn format_shared(converter: &DatePatternConverter, millis: i64, threads: usize) -> Result<String> {
    let format_once = || {
        let mut out = String::new();
        converter.format_millis(millis, &mut out);
        out
    };

    if threads <= 1 {
        return Ok(format_once());
    }

    let results: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads).map(|_| s.spawn(format_once)).collect();
        handles
            .into_iter()
            .map(|h| h.join())
            .collect::<Result<Vec<String>, _>>()
    })
    .map_err(|_| anyhow!("A formatting thread panicked"))?;

    check_agreement(millis, results)
}

fn check_agreement(millis: i64, results: Vec<String>) -> Result<String> {
    let Some(first) = results.first() else {
        bail!("No formatting results for {millis}");
    };
    if let Some(other) = results.iter().find(|r| *r != first) {
        bail!("Threads disagreed on {millis}: '{first}' vs '{other}'");
    }
    Ok(first.clone())
}
