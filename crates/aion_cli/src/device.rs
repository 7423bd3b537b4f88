//! `aion-pack device`: synthetic chip database generation.

use std::fs;

use aion_arch::xilinx::series7::{BankKind, IoBank, IoColumn};
use aion_arch::{Architecture, Device};

use crate::{DeviceArgs, GlobalArgs};

/// Runs the `aion-pack device` command.
pub fn run(args: &DeviceArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let device = build_device(&args.name, &args.banks)?;
    let json = serde_json::to_string_pretty(&device)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json)?;
            if !global.quiet {
                eprintln!(
                    "   Wrote {} ({} sites) to {}",
                    device.device_name(),
                    device.site_count(),
                    path.display()
                );
            }
        }
        None => println!("{json}"),
    }
    Ok(0)
}

/// Builds an I/O column from `NUMBER:KIND:SITES` bank specs.
///
/// Site numbering continues from one bank to the next so every site name
/// and package pin is unique.
pub fn build_device(name: &str, banks: &[String]) -> Result<Device, Box<dyn std::error::Error>> {
    let mut column = IoColumn::new(name);
    let mut next_site = 0;
    for spec in banks {
        let (number, kind, count) = parse_bank(spec)?;
        column = column.bank(IoBank::new(number, kind).numbered_sites(next_site, count));
        next_site += count;
    }
    Ok(column.build()?)
}

fn parse_bank(spec: &str) -> Result<(u32, BankKind, u32), String> {
    let bad = || format!("invalid bank '{spec}', expected NUMBER:KIND:SITES");
    let mut fields = spec.split(':');
    let (Some(number), Some(kind), Some(count), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(bad());
    };
    let number = number.parse().map_err(|_| bad())?;
    let kind = match kind.to_ascii_lowercase().as_str() {
        "hr" => BankKind::HighRange,
        "hp" => BankKind::HighPerformance,
        other => return Err(format!("unknown bank kind '{other}', expected 'hr' or 'hp'")),
    };
    let count = count.parse().map_err(|_| bad())?;
    Ok((number, kind, count))
}
