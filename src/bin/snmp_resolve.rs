//! snmp-resolve: run one resolution cycle against an agent and print the
//! property mapping.

use clap::Parser;
use snmp_resolver::Resolver;
use snmp_resolver::cli::args::{CommonArgs, OutputArgs, PropertyArgs, V3Args, build_config};
use snmp_resolver::cli::output::{OutputContext, write_error};
use std::process::ExitCode;
use std::time::Instant;

/// Resolve OID:PropertyName pairs on an SNMP agent.
#[derive(Debug, Parser)]
#[command(name = "snmp-resolve", version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    v3: V3Args,

    #[command(flatten)]
    properties: PropertyArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.output.init_tracing();

    let config = match build_config(&args.common, &args.v3, &args.properties) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let target = format!("{}:{}", config.host, config.port);

    let resolver = match Resolver::new(config) {
        Ok(resolver) => resolver,
        Err(e) => {
            write_error(&e);
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let result = resolver.resolve_with_stats().await;
    let elapsed = start.elapsed();

    if let Err(e) = resolver.close().await {
        write_error(&e);
    }

    match result {
        Ok(report) => {
            let ctx = OutputContext {
                format: args.output.format,
                show_stats: args.output.stats,
            };
            if let Err(e) = ctx.write_report(&target, &resolver.version().to_string(), &report, elapsed) {
                eprintln!("Error writing output: {}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            write_error(&e);
            ExitCode::FAILURE
        }
    }
}
