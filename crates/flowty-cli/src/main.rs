use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flowty")]
#[command(about = "Flowty - flow-sensitive type narrowing over .flow files")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a narrowing query against an expression occurrence.
    Narrow {
        input: PathBuf,

        /// Query every occurrence of this expression.
        #[arg(short, long)]
        expr: Option<String>,

        /// Query the push instruction at this index.
        #[arg(long, conflicts_with = "expr")]
        at: Option<u32>,

        /// Flow to query when the file holds more than one.
        #[arg(short, long)]
        flow: Option<String>,

        /// Instruction index execution starts from.
        #[arg(long, default_value_t = 0)]
        start: u32,

        #[arg(long)]
        step_limit: Option<usize>,

        #[arg(long)]
        json: bool,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse a .flow file and report whether it is well formed.
    Validate {
        input: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Re-emit the parsed flows in canonical text form.
    Dump {
        input: PathBuf,

        /// Annotate every instruction with its index.
        #[arg(long)]
        annotated: bool,

        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Narrow {
            input,
            expr,
            at,
            flow,
            start,
            step_limit,
            json,
            verbose,
        } => cmd_narrow(input, expr, at, flow, start, step_limit, json, verbose),
        Commands::Validate { input, verbose } => cmd_validate(input, verbose),
        Commands::Dump {
            input,
            annotated,
            verbose,
        } => cmd_dump(input, annotated, verbose),
    }
}

fn select_flow(
    flows: Vec<flowty_core::FlowGraph>,
    wanted: Option<&str>,
) -> Result<flowty_core::FlowGraph> {
    match wanted {
        Some(name) => flows
            .into_iter()
            .find(|flow| flow.name() == name)
            .ok_or_else(|| anyhow!("no flow named `{}` in the input", name)),
        None => {
            let mut flows = flows;
            match flows.len() {
                0 => bail!("the input contains no flows"),
                1 => Ok(flows.remove(0)),
                n => bail!("the input contains {} flows; pick one with --flow", n),
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_narrow(
    input: PathBuf,
    expr: Option<String>,
    at: Option<u32>,
    flow_name: Option<String>,
    start: u32,
    step_limit: Option<usize>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    use colored::*;
    use flowty_core::{InstrIndex, NarrowingQuery};
    use flowty_emit::NarrowingReport;

    let flows = flowty_parser::parse_path(&input)?;
    let flow = select_flow(flows, flow_name.as_deref())?;

    let usages: Vec<InstrIndex> = match (&expr, at) {
        (_, Some(index)) => vec![InstrIndex(index)],
        (Some(text), None) => {
            let expr = flowty_parser::parse_expr(text)?;
            let usages = flow.find_usages(&expr);
            if usages.is_empty() {
                println!(
                    "{}",
                    format!("no occurrences of `{}` in flow `{}`", text, flow.name()).yellow()
                );
                return Ok(());
            }
            usages
        }
        (None, None) => bail!("pass --expr or --at to pick the occurrence to query"),
    };

    if verbose {
        println!("{}", format!("flow `{}`", flow.name()).bright_blue().bold());
        println!("  input: {}", input.display());
        println!("  occurrences: {}", usages.len());
        println!();
    }

    let mut query = NarrowingQuery::new(&flow).starting_at(InstrIndex(start));
    if let Some(step_limit) = step_limit {
        query = query.with_step_limit(step_limit);
    }

    let mut json_reports = Vec::new();
    for usage in usages {
        let result = query.run(usage);
        let report = NarrowingReport::new(&flow, usage, &result);
        if json {
            json_reports.push(report.to_json());
        } else {
            print!("{}", report.to_human(true));
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::Value::Array(json_reports))?
        );
    }

    Ok(())
}

fn cmd_validate(input: PathBuf, verbose: bool) -> Result<()> {
    use colored::*;

    let content = std::fs::read_to_string(&input)?;

    match flowty_parser::parse(&content) {
        Ok(flows) => {
            println!("{}", "VALID".bright_green().bold());
            if verbose {
                for flow in &flows {
                    println!("  flow `{}`: {} instructions", flow.name(), flow.len());
                }
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", "INVALID".bright_red().bold());
            println!("\n{}", "Parse error:".bright_red());
            println!("{}", e);
            Err(anyhow!("validation failed"))
        }
    }
}

fn cmd_dump(input: PathBuf, annotated: bool, verbose: bool) -> Result<()> {
    use flowty_emit::{Emitter, FlowEmitter};

    let flows = flowty_parser::parse_path(&input)?;
    if verbose {
        println!("// {} flow(s) in {}", flows.len(), input.display());
    }

    let emitter = if annotated {
        FlowEmitter::new().with_indices()
    } else {
        FlowEmitter::new()
    };

    for flow in &flows {
        print!("{}", emitter.emit_to_string(flow)?);
    }

    Ok(())
}
