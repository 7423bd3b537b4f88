//! `aion-pack legalize`: the batch legalization pipeline.
//!
//! 1. Load the chip database and rebuild its lookups
//! 2. Load the netlist and rebuild its indices
//! 3. Load `pack.toml` if given, else use defaults
//! 4. Run every legalization pass
//! 5. Render diagnostics and write the legalized netlist

use std::fs;
use std::path::Path;

use aion_arch::Device;
use aion_config::PackConfig;
use aion_diagnostics::{DiagnosticRenderer, DiagnosticSink, JsonRenderer, TerminalRenderer};
use aion_pack::{legalize, Netlist, PackSummary, RunToCompletion};
use tracing::info;

use crate::{GlobalArgs, LegalizeArgs, ReportFormat};

/// Runs the `aion-pack legalize` command.
///
/// Returns exit code 0 when legalization succeeds, 1 when it fails.
pub fn run(args: &LegalizeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let device = load_device(&args.device)?;
    let mut netlist = load_netlist(&args.netlist)?;
    let config = match &args.config {
        Some(path) => aion_config::load_config(path)?,
        None => PackConfig::default(),
    };
    info!(
        device = %device.name,
        cells = netlist.cell_count(),
        nets = netlist.net_count(),
        "loaded design"
    );

    let sink = DiagnosticSink::new();
    let result = legalize(&mut netlist, &device, &config, &sink, &RunToCompletion);
    render(&sink, args.format.clone(), global);

    let summary = match result {
        Ok(summary) => summary,
        Err(_) => return Ok(1),
    };
    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!("{}", summary_line(&summary));
    }

    let json = serde_json::to_string_pretty(&netlist)?;
    match &args.output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(0)
}

/// Reads a JSON chip database.
pub fn load_device(path: &Path) -> Result<Device, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read device '{}': {e}", path.display()))?;
    let mut device: Device = serde_json::from_str(&content)
        .map_err(|e| format!("failed to parse device '{}': {e}", path.display()))?;
    device.rebuild_indices()?;
    Ok(device)
}

/// Reads a JSON netlist.
pub fn load_netlist(path: &Path) -> Result<Netlist, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read netlist '{}': {e}", path.display()))?;
    let mut netlist: Netlist = serde_json::from_str(&content)
        .map_err(|e| format!("failed to parse netlist '{}': {e}", path.display()))?;
    netlist.rebuild_indices()?;
    Ok(netlist)
}

fn render(sink: &DiagnosticSink, format: ReportFormat, global: &GlobalArgs) {
    let renderer: Box<dyn DiagnosticRenderer> = match format {
        ReportFormat::Text => Box::new(TerminalRenderer::new(global.color)),
        ReportFormat::Json => Box::new(JsonRenderer),
    };
    for diag in sink.take_all() {
        if global.quiet && !diag.severity.shown_when_quiet() {
            continue;
        }
        eprint!("{}", renderer.render(&diag));
    }
}

fn summary_line(summary: &PackSummary) -> String {
    format!(
        "   Legalized: {} pad(s) ({} constrained, {} allocated), {} macro(s) decomposed, \
         {} I/O logic cell(s), {} control clone(s)",
        summary.pads,
        summary.constrained,
        summary.allocated,
        summary.decomposed,
        summary.iologic,
        summary.control_clones
    )
}
