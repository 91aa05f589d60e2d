//! CLI handler for masking a dump.

use crate::masker::{HashCost, MaskStats, RunContext};
use crate::parser::READ_BUFFER_SIZE;
use crate::stream::{mask_stream, Compression};
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

pub struct MaskOptions {
    pub config: PathBuf,
    pub file: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub cost: u32,
    pub check: bool,
    pub quiet: bool,
    pub stats: bool,
    pub json: bool,
}

/// `--check --json` output
#[derive(Serialize)]
struct CheckResult {
    valid: bool,
    tables: usize,
    rules: usize,
    table_names: Vec<String>,
}

impl CheckResult {
    fn new(ctx: &RunContext) -> Self {
        let mut table_names: Vec<String> = ctx.rules.table_names().map(str::to_string).collect();
        table_names.sort();
        Self {
            valid: true,
            tables: ctx.rules.len(),
            rules: ctx.rules.rule_count(),
            table_names,
        }
    }
}

pub fn run(opts: MaskOptions) -> anyhow::Result<()> {
    let cost = HashCost::new(opts.cost)?;

    // Config errors must surface before any input is read
    let ctx = RunContext::from_config_file(&opts.config, cost)?;

    if opts.check {
        if opts.json {
            println!("{}", serde_json::to_string_pretty(&CheckResult::new(&ctx))?);
        } else {
            eprintln!(
                "Configuration is valid: {} tables, {} column rules",
                ctx.rules.len(),
                ctx.rules.rule_count()
            );
        }
        return Ok(());
    }

    let reader = open_input(opts.file.as_ref())?;
    let stderr = io::stderr();

    let stats = match opts.output {
        Some(ref path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create output file {}", path.display()))?;
            let writer = BufWriter::with_capacity(READ_BUFFER_SIZE, file);
            mask_stream(&ctx, reader, writer, stderr.lock(), opts.quiet)?
        }
        None => {
            let stdout = io::stdout();
            let writer = BufWriter::with_capacity(READ_BUFFER_SIZE, stdout.lock());
            mask_stream(&ctx, reader, writer, stderr.lock(), opts.quiet)?
        }
    };

    if opts.stats {
        output_stats(&stats, opts.json)?;
    }

    Ok(())
}

fn open_input(file: Option<&PathBuf>) -> anyhow::Result<Box<dyn BufRead>> {
    match file {
        Some(path) => {
            let handle = File::open(path)
                .with_context(|| format!("cannot open input file {}", path.display()))?;
            let compression = Compression::from_path(path);
            let reader = compression
                .wrap_reader(Box::new(handle))
                .with_context(|| format!("cannot open {} stream", compression))?;
            Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, reader)))
        }
        None => Ok(Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            io::stdin(),
        ))),
    }
}

fn output_stats(stats: &MaskStats, json: bool) -> anyhow::Result<()> {
    let mut err = io::stderr().lock();
    if json {
        writeln!(err, "{}", serde_json::to_string_pretty(stats)?)?;
    } else {
        writeln!(err, "\nMasking complete:")?;
        writeln!(err, "  Lines: {}", stats.lines)?;
        writeln!(err, "  INSERT statements: {}", stats.statements)?;
        writeln!(err, "  Statements masked: {}", stats.statements_masked)?;
        writeln!(err, "  Values masked: {}", stats.values_masked)?;
        writeln!(err, "  Tables cataloged: {}", stats.tables_cataloged)?;
        writeln!(err, "  Hash cache hits: {}", stats.hash_cache_hits)?;
        if stats.parse_errors > 0 {
            writeln!(
                err,
                "  Unparsed INSERT lines passed through: {}",
                stats.parse_errors
            )?;
        }
    }
    Ok(())
}
