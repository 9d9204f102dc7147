//! opcua-metrics CLI entry point.
//!
//! Reads the configured nodes once, prints the metric block to stdout and
//! exits with the check state code (0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN).
//!
//! ```bash
//! opcua-metrics -e opc.tcp://plc:4840 -n "ns=2;s=Temperature, ns=2;s=Pressure" -t "site=plant1"
//! ```

use clap::Parser;

use opcua_metrics::check::{execute_check, CheckOutcome, ProbeArgs};
use opcua_metrics::core::logging::init_tracing;
use opcua_metrics::protocols::opcua::OpcUaTransport;

#[tokio::main]
async fn main() {
    let args = ProbeArgs::parse();

    if let Err(e) = init_tracing(&args.log_config()) {
        eprintln!("{}", e);
    }

    // A panicking check reports UNKNOWN
    let outcome = tokio::spawn(async move {
        let mut transport = OpcUaTransport::new(args.channel_config());
        execute_check(&args, &mut transport).await
    })
    .await
    .unwrap_or_else(|e| CheckOutcome::unknown(format!("check aborted: {}", e)));

    // The metric block already ends with a newline, so this leaves one blank line
    println!("{}", outcome.output);
    std::process::exit(outcome.exit_code());
}
