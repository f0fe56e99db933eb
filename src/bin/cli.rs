use anyhow::{bail, Context};
use crabshutter::testing::SimulatedBackend;
use crabshutter::{CameraApp, CrabShutterConfig, DeviceCatalog, PresetPermissionGate};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    crabshutter::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabshutter-cli <list-devices|capture|info> [args]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "list-devices" => cmd_list_devices(&args),
        "capture" => cmd_capture(&args),
        "info" => {
            println!("{}", serde_json::to_string_pretty(&crabshutter::get_info())?);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn cmd_list_devices(args: &[String]) -> anyhow::Result<()> {
    let catalog = DeviceCatalog::new(Arc::new(SimulatedBackend::new()));
    let devices = catalog.enumerate();
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&devices)?);
    } else {
        for d in devices {
            println!("{}", d);
        }
    }
    Ok(())
}

struct CaptureArgs {
    config: CrabShutterConfig,
    zoom: Option<f64>,
    lens: Option<String>,
    count: usize,
    json: bool,
}

fn parse_capture_args(args: &[String]) -> anyhow::Result<CaptureArgs> {
    // capture [--config <file>] [--no-raw] [--zoom <f>] [--fix-zoomed-exposure]
    //         [--lens <model_id>] [--count <n>] [--out <dir>] [--json]
    let mut parsed = CaptureArgs {
        config: CrabShutterConfig::default(),
        zoom: None,
        lens: None,
        count: 1,
        json: false,
    };
    let mut no_raw = false;
    let mut fix_zoomed_exposure = false;
    let mut out: Option<PathBuf> = None;

    let mut i = 2;
    while i < args.len() {
        let value = |i: usize| {
            args.get(i + 1)
                .with_context(|| format!("{} needs a value", args[i]))
        };
        match args[i].as_str() {
            "--config" => {
                parsed.config = CrabShutterConfig::load_from_file(value(i)?)?;
                i += 1;
            }
            "--zoom" => {
                parsed.zoom = Some(value(i)?.parse().context("invalid zoom factor")?);
                i += 1;
            }
            "--lens" => {
                parsed.lens = Some(value(i)?.clone());
                i += 1;
            }
            "--count" => {
                parsed.count = value(i)?.parse().context("invalid count")?;
                i += 1;
            }
            "--out" => {
                out = Some(PathBuf::from(value(i)?));
                i += 1;
            }
            "--no-raw" => no_raw = true,
            "--fix-zoomed-exposure" => fix_zoomed_exposure = true,
            "--json" => parsed.json = true,
            other => bail!("Unknown capture option: {}", other),
        }
        i += 1;
    }

    if no_raw {
        parsed.config.camera.use_raw = false;
    }
    if fix_zoomed_exposure {
        parsed.config.camera.fix_zoomed_exposure = true;
    }
    if let Some(out) = out {
        parsed.config.storage.album_directory = out;
    }
    Ok(parsed)
}

#[derive(serde::Serialize)]
struct CaptureReport {
    index: usize,
    success: bool,
    saved_file: Option<PathBuf>,
}

fn cmd_capture(args: &[String]) -> anyhow::Result<()> {
    let parsed = parse_capture_args(args)?;
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async move {
        let app = CameraApp::from_config(
            Arc::new(SimulatedBackend::new()),
            Arc::new(PresetPermissionGate::granted()),
            &parsed.config,
        )?;

        let device = app.setup_camera().await?;
        log::info!("Using {}", device);

        if let Some(lens) = &parsed.lens {
            let outcome = app.session().switch_lens(lens).await?;
            log::info!("Lens switch: {:?}", outcome);
        }
        if let Some(zoom) = parsed.zoom {
            app.session().zoom(zoom, false);
        }

        let mut reports = Vec::with_capacity(parsed.count);
        for index in 0..parsed.count {
            let success = app.capture().await;
            reports.push(CaptureReport {
                index,
                success,
                saved_file: app.session().saved_file(),
            });
        }
        app.stop_camera().await;

        if parsed.json {
            println!("{}", serde_json::to_string(&reports)?);
        } else {
            for r in &reports {
                match (&r.saved_file, r.success) {
                    (Some(path), true) => println!("capture {}: saved {}", r.index, path.display()),
                    _ => println!("capture {}: failed", r.index),
                }
            }
        }

        anyhow::ensure!(
            reports.iter().all(|r| r.success),
            "one or more captures failed"
        );
        Ok::<(), anyhow::Error>(())
    })
}
