// src/main.rs

use std::env;
use std::error::Error;
use std::path::Path;

use frc_sysid::config::{
    AnalysisSettings, FeedbackSettings, GainPreset, LoopType, MechanismKind,
};
use frc_sysid::data_analysis::gains::compute_gains;
use frc_sysid::data_analysis::prepare::{prepare_dataset, Subset};
use frc_sysid::data_analysis::regression::{fit_subset, round_sig_figs};
use frc_sysid::data_analysis::track_width::calc_track_width;
use frc_sysid::data_input::capture::CaptureSet;
use frc_sysid::plot_functions::plot_time_domain::plot_time_domain;
use frc_sysid::plot_functions::plot_voltage_domain::plot_voltage_domain;

fn print_usage(program: &str) {
    eprintln!("Usage: {program} <capture.json> [options]");
    eprintln!("  --subset <name>       analysis subset (default depends on mechanism)");
    eprintln!("  --loop <kind>         feedback loop: position or velocity (default position)");
    eprintln!("  --preset <name>       controller gain preset (default \"Default\")");
    eprintln!("  --window <samples>    acceleration smoothing window");
    eprintln!("  --threshold <u/s>     quasistatic motion threshold");
    eprintln!("  --qp <units>          max acceptable position error");
    eprintln!("  --qv <units/s>        max acceptable velocity error");
    eprintln!("  --effort <volts>      max acceptable control effort");
    eprintln!("  --plots               write diagnostic PNGs next to the input");
    eprintln!("\nAvailable presets:");
    for preset in GainPreset::ALL {
        eprintln!("  {}", preset.name());
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // --- Argument Parsing ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }
    let input_file = &args[1];

    let mut subset_name: Option<String> = None;
    let mut loop_type = LoopType::Position;
    let mut preset = GainPreset::Default;
    let mut window: Option<usize> = None;
    let mut threshold: Option<f64> = None;
    let mut qp: Option<f64> = None;
    let mut qv: Option<f64> = None;
    let mut effort: Option<f64> = None;
    let mut make_plots = false;

    let mut i = 2;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = |name: &str| -> Result<String, Box<dyn Error>> {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| format!("missing value for {name}").into())
        };
        match flag {
            "--subset" => subset_name = Some(value("--subset")?),
            "--loop" => {
                loop_type = match value("--loop")?.as_str() {
                    "position" => LoopType::Position,
                    "velocity" => LoopType::Velocity,
                    other => return Err(format!("unknown loop type '{other}'").into()),
                }
            }
            "--preset" => {
                let name = value("--preset")?;
                preset = GainPreset::from_name(&name)
                    .ok_or_else(|| format!("unknown preset '{name}'"))?;
            }
            "--window" => window = Some(value("--window")?.parse()?),
            "--threshold" => threshold = Some(value("--threshold")?.parse()?),
            "--qp" => qp = Some(value("--qp")?.parse()?),
            "--qv" => qv = Some(value("--qv")?.parse()?),
            "--effort" => effort = Some(value("--effort")?.parse()?),
            "--plots" => make_plots = true,
            other => {
                print_usage(&args[0]);
                return Err(format!("unknown option '{other}'").into());
            }
        }
        i += 1;
    }

    println!("frc-sysid v{}", frc_sysid::crate_version());

    // --- Capture Loading ---
    println!("\nLoading capture: {input_file}");
    let capture = CaptureSet::load(Path::new(input_file))?;
    println!("  Mechanism: {}", capture.mechanism);
    println!(
        "  Units: {:?} ({} per rotation)",
        capture.units, capture.units_per_rotation
    );

    let mut analysis = AnalysisSettings::new(capture.units, capture.units_per_rotation);
    if let Some(w) = window {
        analysis.window_size = w;
    }
    if let Some(t) = threshold {
        analysis.motion_threshold = t;
    }

    // --- Data Preparation ---
    println!("\nPreparing test data...");
    let dataset = prepare_dataset(&capture, &analysis)?;
    for (subset, data) in dataset.iter() {
        println!(
            "  {}: {} quasistatic + {} dynamic samples",
            subset.name(),
            data.quasistatic.len(),
            data.dynamic.len()
        );
    }

    let subset = match &subset_name {
        Some(name) => Subset::from_name(capture.mechanism, name).ok_or_else(|| {
            let available: Vec<&str> = Subset::for_mechanism(capture.mechanism)
                .iter()
                .map(|s| s.name())
                .collect();
            format!(
                "subset '{name}' is not available for {}; choose one of: {}",
                capture.mechanism,
                available.join(", ")
            )
        })?,
        None => Subset::default_for(capture.mechanism),
    };
    let data = dataset
        .get(subset)
        .ok_or_else(|| format!("subset '{}' was not prepared", subset.name()))?;

    // --- Feedforward Fit ---
    println!("\nFitting feedforward model ({})...", subset.name());
    let fit = fit_subset(data, capture.mechanism)?;
    let sig3 = |x: f64| round_sig_figs(x, 3);
    println!("  kS   = {} V", sig3(fit.ks));
    println!("  kV   = {} V/(unit/s)", sig3(fit.kv));
    println!("  kA   = {} V/(unit/s^2)", sig3(fit.ka));
    if let Some(kg) = fit.kg {
        println!("  kG   = {} V", sig3(kg));
    }
    if let Some(kcos) = fit.kcos {
        println!("  kCos = {} V", sig3(kcos));
    }
    println!("  R^2  = {}", sig3(fit.r_squared));

    if capture.mechanism == MechanismKind::Drivetrain {
        if let Some(spin) = &capture.track_width {
            if let Some(width) = calc_track_width(spin, &analysis)? {
                println!("  Track width = {} units", sig3(width));
            }
        }
    }

    // --- Feedback Gains ---
    println!("\nComputing feedback gains ({} loop, preset \"{}\")...", match loop_type {
        LoopType::Position => "position",
        LoopType::Velocity => "velocity",
    }, preset.name());
    let mut fb = FeedbackSettings::from_preset(preset, loop_type);
    if let Some(v) = qp {
        fb.qp = v;
    }
    if let Some(v) = qv {
        fb.qv = v;
    }
    if let Some(v) = effort {
        fb.max_effort = v;
    }
    let gains = compute_gains(&fit, &fb, &analysis)?;
    println!("  kP = {}", sig3(gains.kp));
    println!("  kD = {}", sig3(gains.kd));
    if gains.reduced_order {
        println!("  (reduced-order model; kA was effectively zero)");
    }

    // --- Diagnostic Plots ---
    if make_plots {
        println!("\nGenerating diagnostic plots...");
        let stem = Path::new(input_file)
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy();
        let root_name = format!("{stem}_{}", subset.name().replace(' ', ""));
        plot_time_domain(data, subset.name(), &root_name)?;
        plot_voltage_domain(data, &fit, subset.name(), &root_name)?;
    }

    println!("\nDone.");
    Ok(())
}
