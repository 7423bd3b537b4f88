//! End-to-end legalization of top-level I/O: pad insertion, binding,
//! decomposition and the I/O transform.

use aion_arch::xilinx::series7::{IoBank, IoColumn};
use aion_arch::{Architecture, Device, TileFamily};
use aion_config::PackConfig;
use aion_diagnostics::{DiagnosticSink, Severity, Subject};
use aion_pack::decompose::parse_macro_ports;
use aion_pack::rules::{generic_io_rules, io_buffer_rules};
use aion_pack::xform::first_candidate;
use aion_pack::{
    apply_rules, legalize, CellId, CellType, JobControl, LegalizeError, NetId, Netlist, Pass,
    PassControl, PassObserver, PortDirection, RunToCompletion, Scope,
};
use std::collections::BTreeSet;

fn config_with_default_std() -> PackConfig {
    let mut config = PackConfig::default();
    config.io.default_iostandard = Some("LVCMOS33".into());
    config
}

fn bel_of(nl: &Netlist, name: &str) -> Option<String> {
    let id = nl.cell_by_name(name)?;
    nl.cell(id).ok()?.attr_str("BEL").map(str::to_string)
}

/// Adds a top-level port marker with one port on a fresh net.
fn marker(nl: &mut Netlist, name: &str, ty: CellType, port: &str, dir: PortDirection) -> NetId {
    let m = nl.add_cell(name, ty).unwrap();
    let net = nl.add_net(name).unwrap();
    nl.add_connected_port(m, port, dir, Some(net)).unwrap();
    net
}

/// Adds an opaque fabric cell driving each of `outs` and reading `ins`.
fn logic(nl: &mut Netlist, name: &str, outs: &[NetId], ins: &[NetId]) -> CellId {
    let c = nl
        .add_cell(name, CellType::from_name("FDRE_GROUP"))
        .unwrap();
    for (i, &net) in outs.iter().enumerate() {
        nl.add_connected_port(c, &format!("Q{i}"), PortDirection::Out, Some(net))
            .unwrap();
    }
    for (i, &net) in ins.iter().enumerate() {
        nl.add_connected_port(c, &format!("D{i}"), PortDirection::In, Some(net))
            .unwrap();
    }
    c
}

/// One `IOBUF` on a pin constrained to `PIN_A7`.
fn iobuf_design() -> (Device, Netlist) {
    let dev = IoColumn::new("xc7-test")
        .bank(
            IoBank::high_range(14)
                .numbered_sites(0, 2)
                .site("IOB_12", Some("PIN_A7")),
        )
        .build()
        .unwrap();

    let mut nl = Netlist::new();
    let io = marker(&mut nl, "io", CellType::InoutMarker, "O", PortDirection::Out);
    let m = nl.cell_by_name("io").unwrap();
    let cell = nl.cell_mut(m).unwrap();
    cell.set_attr("PACKAGE_PIN", "PIN_A7");
    cell.set_attr("IOSTANDARD", "LVCMOS33");
    cell.set_attr("DRIVE", 8i64);

    let a = nl.add_net("a").unwrap();
    let t = nl.add_net("t").unwrap();
    let b = nl.add_net("b").unwrap();
    let iobuf = nl.add_cell("u_io", CellType::Iobuf).unwrap();
    nl.add_connected_port(iobuf, "IO", PortDirection::InOut, Some(io))
        .unwrap();
    nl.add_connected_port(iobuf, "I", PortDirection::In, Some(a))
        .unwrap();
    nl.add_connected_port(iobuf, "T", PortDirection::In, Some(t))
        .unwrap();
    nl.add_connected_port(iobuf, "O", PortDirection::Out, Some(b))
        .unwrap();
    logic(&mut nl, "core", &[a, t], &[b]);
    (dev, nl)
}

#[test]
fn iobuf_on_constrained_pin() {
    let (dev, mut nl) = iobuf_design();
    let sink = DiagnosticSink::new();
    let summary = legalize(
        &mut nl,
        &dev,
        &PackConfig::default(),
        &sink,
        &RunToCompletion,
    )
    .unwrap();

    assert_eq!(summary.pads, 1);
    assert_eq!(summary.constrained, 1);
    assert_eq!(summary.allocated, 0);
    assert_eq!(summary.decomposed, 1);

    let pad = nl.cell_by_name("io").unwrap();
    assert_eq!(nl.cell(pad).unwrap().cell_type, CellType::Pad);
    assert_eq!(bel_of(&nl, "io").as_deref(), Some("IOB_12/PAD"));
    assert_eq!(nl.cell(pad).unwrap().attr_str("LOC"), Some("PIN_A7"));

    let ibuf = nl.cell_by_name("u_io$subcell$IBUF").unwrap();
    let obuf = nl.cell_by_name("u_io$subcell$OBUFT").unwrap();
    assert_eq!(nl.cell(ibuf).unwrap().cell_type, CellType::Iob33InbufEn);
    assert_eq!(nl.cell(obuf).unwrap().cell_type, CellType::Iob33Outbuf);
    assert_eq!(bel_of(&nl, "u_io$subcell$IBUF").as_deref(), Some("IOB_12/INBUF_EN"));
    assert_eq!(bel_of(&nl, "u_io$subcell$OBUFT").as_deref(), Some("IOB_12/OUTBUF"));
    assert!(nl.cell_by_name("u_io").is_none());

    // Pad, input buffer and output buffer share the pad net.
    let pad_net = nl.port_net(pad, "PAD").unwrap().unwrap();
    assert_eq!(nl.port_net(ibuf, "PAD").unwrap(), Some(pad_net));
    assert_eq!(nl.driver_cell(pad_net).unwrap(), Some(obuf));
    assert!(nl.port_net(obuf, "TRI").unwrap().is_some());

    assert!(!sink.has_errors());
    let progress = sink.messages(Severity::Info);
    assert_eq!(progress[0], "Inserting IO buffers..");
    assert!(progress.contains(&"Constraining 'io' to site 'IOB_12'".to_string()));
    assert!(progress.contains(&"Generating input buffer for 'u_io'".to_string()));
}

#[test]
fn provenance_on_iobuf_subcells() {
    let (dev, mut nl) = iobuf_design();
    legalize(
        &mut nl,
        &dev,
        &PackConfig::default(),
        &DiagnosticSink::new(),
        &RunToCompletion,
    )
    .unwrap();
    for name in ["u_io$subcell$IBUF", "u_io$subcell$OBUFT"] {
        let id = nl.cell_by_name(name).unwrap();
        let cell = nl.cell(id).unwrap();
        assert_eq!(cell.attr_str("X_ORIG_MACRO_PRIM"), Some("IOBUF"));
    }
    let obuf = nl.cell_by_name("u_io$subcell$OBUFT").unwrap();
    let io = nl.cell(obuf).unwrap().attr_str("X_MACRO_PORTS_O").unwrap();
    assert_eq!(
        parse_macro_ports(io),
        vec![("IO".to_string(), "inout".to_string(), true)]
    );
}

#[test]
fn drive_strength_rejected_for_family() {
    let (dev, mut nl) = iobuf_design();
    let pad = nl.cell_by_name("io").unwrap();
    nl.cell_mut(pad).unwrap().set_attr("DRIVE", 6i64);
    let sink = DiagnosticSink::new();
    let err = legalize(&mut nl, &dev, &PackConfig::default(), &sink, &RunToCompletion).unwrap_err();
    assert!(matches!(err, LegalizeError::Electrical { .. }));
    assert_eq!(sink.error_count(), 1);
    assert_eq!(
        sink.messages(Severity::Error),
        vec!["unsupported DRIVE strength property 6 for port 'io'".to_string()]
    );
}

#[test]
fn unknown_package_pin() {
    let (dev, mut nl) = iobuf_design();
    let pad = nl.cell_by_name("io").unwrap();
    nl.cell_mut(pad).unwrap().set_attr("PACKAGE_PIN", "PIN_Z9");
    let sink = DiagnosticSink::new();
    let err = legalize(&mut nl, &dev, &PackConfig::default(), &sink, &RunToCompletion).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unable to constrain IO 'io', device does not have a pin named 'PIN_Z9'"
    );
    assert_eq!(err.subject(), Some(&Subject::Cell("io".into())));
    assert!(sink.has_errors());
}

#[test]
fn transform_rules_are_idempotent() {
    let (dev, mut nl) = iobuf_design();
    legalize(
        &mut nl,
        &dev,
        &PackConfig::default(),
        &DiagnosticSink::new(),
        &RunToCompletion,
    )
    .unwrap();
    for family in [TileFamily::HighRangeIo, TileFamily::HighPerformanceIo] {
        let n = apply_rules(&mut nl, &io_buffer_rules(family), &Scope::All, &first_candidate).unwrap();
        assert_eq!(n, 0);
    }
    let n = apply_rules(&mut nl, &generic_io_rules(), &Scope::All, &first_candidate).unwrap();
    assert_eq!(n, 0);
}

#[test]
fn no_dangling_nets_after_legalization() {
    let (dev, mut nl) = iobuf_design();
    legalize(
        &mut nl,
        &dev,
        &PackConfig::default(),
        &DiagnosticSink::new(),
        &RunToCompletion,
    )
    .unwrap();
    for (_, net) in nl.nets() {
        assert!(!net.is_unconnected(), "net '{}' survived pruning", net.name);
        if net.driver.is_none() {
            let pad_terminal = net.users.iter().any(|u| {
                let cell = nl.cell(u.cell).unwrap();
                cell.cell_type == CellType::Pad
                    && cell.ports[&u.port].direction == PortDirection::InOut
            });
            assert!(pad_terminal, "net '{}' has users but no driver", net.name);
        }
    }
}

fn input_pads(n: usize, constrained: Option<&str>) -> Netlist {
    let mut nl = Netlist::new();
    for i in 0..n {
        let name = format!("in{i}");
        marker(&mut nl, &name, CellType::InputMarker, "O", PortDirection::Out);
    }
    if let Some(pin) = constrained {
        let id = nl.cell_by_name("in0").unwrap();
        nl.cell_mut(id).unwrap().set_attr("LOC", pin);
    }
    nl
}

fn four_pin_device() -> Device {
    IoColumn::new("t")
        .bank(
            IoBank::high_range(14)
                .reserved_site("IOB_CFG", Some("CFG0"))
                .site("IOB_NC", None)
                .numbered_sites(0, 4),
        )
        .build()
        .unwrap()
}

#[test]
fn allocation_is_a_bijection() {
    let dev = four_pin_device();
    let mut nl = input_pads(4, Some("P2"));
    let summary = legalize(
        &mut nl,
        &dev,
        &config_with_default_std(),
        &DiagnosticSink::new(),
        &RunToCompletion,
    )
    .unwrap();
    assert_eq!(summary.constrained, 1);
    assert_eq!(summary.allocated, 3);

    assert_eq!(bel_of(&nl, "in0").as_deref(), Some("IOB_2/PAD"));
    let sites: BTreeSet<String> = (0..4)
        .map(|i| bel_of(&nl, &format!("in{i}")).unwrap())
        .collect();
    let expected: BTreeSet<String> = (0..4).map(|i| format!("IOB_{i}/PAD")).collect();
    assert_eq!(sites, expected);
    // Free sites are taken in device order.
    assert_eq!(bel_of(&nl, "in1").as_deref(), Some("IOB_0/PAD"));
    assert_eq!(bel_of(&nl, "in3").as_deref(), Some("IOB_3/PAD"));
}

#[test]
fn allocation_exhaustion_keeps_constrained_binding() {
    let dev = four_pin_device();
    let mut nl = input_pads(5, Some("P2"));
    let sink = DiagnosticSink::new();
    let err = legalize(&mut nl, &dev, &config_with_default_std(), &sink, &RunToCompletion)
        .unwrap_err();
    assert!(matches!(err, LegalizeError::Constraint { .. }));
    assert_eq!(
        err.to_string(),
        "IO placer ran out of available IOs (3 available IO, 4 unconstrained pins)"
    );
    assert_eq!(bel_of(&nl, "in0").as_deref(), Some("IOB_2/PAD"));
    let bound: Vec<_> = nl.cells().filter(|(_, c)| c.bel.is_some()).collect();
    assert_eq!(bound.len(), 1);
}

#[test]
fn two_pads_on_one_pin_conflict() {
    let dev = four_pin_device();
    let mut nl = input_pads(2, Some("P1"));
    let second = nl.cell_by_name("in1").unwrap();
    nl.cell_mut(second).unwrap().set_attr("LOC", "P1");
    let err = legalize(
        &mut nl,
        &dev,
        &config_with_default_std(),
        &DiagnosticSink::new(),
        &RunToCompletion,
    )
    .unwrap_err();
    assert!(err.to_string().contains("already occupied by 'in0'"));
}

#[test]
fn obufds_provenance_reconstructs_macro_ports() {
    let dev = IoColumn::new("t")
        .bank(IoBank::high_range(14).numbered_sites(0, 2))
        .build()
        .unwrap();
    let mut nl = Netlist::new();
    let tx_p = marker(&mut nl, "tx_p", CellType::OutputMarker, "I", PortDirection::In);
    let tx_n = marker(&mut nl, "tx_n", CellType::OutputMarker, "I", PortDirection::In);
    let data = nl.add_net("data").unwrap();
    logic(&mut nl, "core", &[data], &[]);
    let ds = nl.add_cell("u_ds", CellType::Obufds).unwrap();
    nl.add_connected_port(ds, "I", PortDirection::In, Some(data))
        .unwrap();
    nl.add_connected_port(ds, "O", PortDirection::Out, Some(tx_p))
        .unwrap();
    nl.add_connected_port(ds, "OB", PortDirection::Out, Some(tx_n))
        .unwrap();

    legalize(
        &mut nl,
        &dev,
        &config_with_default_std(),
        &DiagnosticSink::new(),
        &RunToCompletion,
    )
    .unwrap();

    assert!(nl.cell_by_name("u_ds").is_none());
    assert_eq!(bel_of(&nl, "u_ds/P").as_deref(), Some("IOB_0/OUTBUF"));
    assert_eq!(bel_of(&nl, "u_ds/N").as_deref(), Some("IOB_1/OUTBUF"));
    assert_eq!(bel_of(&nl, "u_ds/INV").as_deref(), Some("IOB_1/O_ININV"));
    let ty = |name: &str| {
        let id = nl.cell_by_name(name).unwrap();
        nl.cell(id).unwrap().cell_type.name().to_string()
    };
    assert_eq!(ty("u_ds/P"), "IOB33M_OUTBUF");
    assert_eq!(ty("u_ds/N"), "IOB33S_OUTBUF");
    assert_eq!(ty("u_ds/INV"), "INVERTER");

    let mut ports = BTreeSet::new();
    let mut shared = BTreeSet::new();
    for (_, cell) in nl.cells() {
        if cell.attr_str("X_ORIG_MACRO_PRIM") != Some("OBUFDS") {
            continue;
        }
        for (key, value) in &cell.attrs {
            if !key.starts_with("X_MACRO_PORTS_") {
                continue;
            }
            let Some(value) = value.as_str() else { continue };
            for (name, dir, is_shared) in parse_macro_ports(value) {
                if is_shared {
                    shared.insert(name.clone());
                }
                ports.insert((name, dir));
            }
        }
    }
    let expected: BTreeSet<(String, String)> = [
        ("I", PortDirection::In),
        ("O", PortDirection::Out),
        ("OB", PortDirection::Out),
    ]
    .into_iter()
    .map(|(n, d)| (n.to_string(), d.as_str().to_string()))
    .collect();
    assert_eq!(ports, expected);
    assert_eq!(shared, BTreeSet::from(["I".to_string()]));
}

#[test]
fn netlist_survives_json_round_trip() {
    let (dev, mut nl) = iobuf_design();
    legalize(
        &mut nl,
        &dev,
        &PackConfig::default(),
        &DiagnosticSink::new(),
        &RunToCompletion,
    )
    .unwrap();
    let json = serde_json::to_string(&nl).unwrap();
    let mut back: Netlist = serde_json::from_str(&json).unwrap();
    back.rebuild_indices().unwrap();
    assert_eq!(back.cell_count(), nl.cell_count());
    assert_eq!(back.net_count(), nl.net_count());
    for (id, net) in nl.nets() {
        let other = back.net(id).unwrap();
        assert_eq!(other.name, net.name);
        assert_eq!(other.driver, net.driver);
        assert_eq!(other.users.len(), net.users.len());
    }
    let io = back.cell_by_name("io").unwrap();
    assert_eq!(
        back.cell(io).unwrap().bel,
        dev.bel_by_name("IOB_12/PAD")
    );
}

struct CancelAfter(Pass);

impl PassObserver for CancelAfter {
    fn pass_started(&self, _pass: Pass) -> PassControl {
        PassControl::Continue
    }

    fn pass_finished(&self, pass: Pass) -> PassControl {
        if pass == self.0 {
            PassControl::Cancel
        } else {
            PassControl::Continue
        }
    }
}

#[test]
fn cancelled_before_first_pass_leaves_netlist_alone() {
    let (dev, mut nl) = iobuf_design();
    let before = nl.cell_count();
    let job = JobControl::new();
    job.cancel();
    let sink = DiagnosticSink::new();
    let err = legalize(&mut nl, &dev, &PackConfig::default(), &sink, &job).unwrap_err();
    assert!(matches!(
        err,
        LegalizeError::Cancelled {
            before: Pass::InsertPads
        }
    ));
    assert_eq!(nl.cell_count(), before);
    assert!(nl.cell_by_name("u_io").is_some());
    assert!(!sink.has_errors());
}

#[test]
fn cancelled_between_passes() {
    let (dev, mut nl) = iobuf_design();
    let sink = DiagnosticSink::new();
    let err = legalize(
        &mut nl,
        &dev,
        &PackConfig::default(),
        &sink,
        &CancelAfter(Pass::BindIo),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        LegalizeError::Cancelled {
            before: Pass::DecomposeIo
        }
    ));
    // Binding completed, decomposition never started.
    assert_eq!(bel_of(&nl, "io").as_deref(), Some("IOB_12/PAD"));
    assert!(nl.cell_by_name("u_io").is_some());
    assert!(sink
        .messages(Severity::Info)
        .contains(&"legalization cancelled before pass 'DecomposeIo'".to_string()));
}

#[test]
fn cancel_after_last_pass_completes() {
    let (dev, mut nl) = iobuf_design();
    let summary = legalize(
        &mut nl,
        &dev,
        &PackConfig::default(),
        &DiagnosticSink::new(),
        &CancelAfter(Pass::FinalTransform),
    );
    assert!(summary.is_ok());
}

#[test]
fn device_family_of_constrained_site() {
    let (dev, _) = iobuf_design();
    let site = dev.package_pin_site("PIN_A7").unwrap();
    assert_eq!(dev.site_family(site), TileFamily::HighRangeIo);
}

#[test]
fn explicit_bel_on_buffer_sub_site_is_rejected() {
    let dev = four_pin_device();
    let mut nl = input_pads(1, None);
    let id = nl.cell_by_name("in0").unwrap();
    let cell = nl.cell_mut(id).unwrap();
    cell.set_attr("BEL", "IOB_0/OUTBUF");
    cell.set_attr("IOSTANDARD", "LVCMOS33");
    let sink = DiagnosticSink::new();
    let err = legalize(&mut nl, &dev, &PackConfig::default(), &sink, &RunToCompletion)
        .unwrap_err();
    assert!(matches!(err, LegalizeError::Constraint { .. }));
    assert!(err.to_string().contains("'IOB_0/OUTBUF'"));
    assert!(sink.has_errors());
}

#[test]
fn foreign_bel_in_loaded_netlist_is_an_error() {
    let dev = four_pin_device();
    let json = r#"{"cells":[{"name":"x","cell_type":"LUT1","ports":{},"bel":9999}],"nets":[]}"#;
    let mut nl: Netlist = serde_json::from_str(json).unwrap();
    nl.rebuild_indices().unwrap();
    let sink = DiagnosticSink::new();
    let err = legalize(&mut nl, &dev, &PackConfig::default(), &sink, &RunToCompletion)
        .unwrap_err();
    assert!(matches!(err, LegalizeError::Constraint { .. }));
    assert_eq!(
        err.to_string(),
        "'x' is bound to BEL #9999, which device 't' does not have"
    );
    assert_eq!(sink.error_count(), 1);
}
