use anyhow::Context;
use clap::Parser;
use detcore::dataset::SampleFormat;
use log::{info, warn};
use std::path::PathBuf;
use std::process;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio::sync::watch;
use workflow::config::DemoConfig;
use workflow::runner::{RunSettings, Runner};

mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Run a 3D detector over point-cloud scenes and record the boxes")]
struct Args {
    /// Detector config (YAML with CLASS_NAMES, DATA_CONFIG, MODEL)
    #[arg(long, default_value = "cfgs/kitti_models/second.yaml")]
    cfg_file: PathBuf,
    /// Root holding the velodyne/, image_2/ and calib/ directories
    #[arg(long, default_value = "demo_data")]
    data_root: PathBuf,
    /// File number selecting the scene inside the data root
    #[arg(long, default_value = "000008")]
    file_number: String,
    /// Recorded predictions (JSON) replayed as the detector output
    #[arg(long)]
    ckpt: Option<PathBuf>,
    /// Point cloud file extension
    #[arg(long, default_value = ".bin")]
    ext: String,
    /// Output directory for detection results
    #[arg(long, default_value = "../results/3dod/vis/")]
    res: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// First press: finish the current sample, then stop.
    Stop,
    /// Repeated press: leave without waiting for the detector.
    Exit,
}

fn handle_interrupt(stop: &watch::Sender<bool>) -> Interrupt {
    if *stop.borrow() {
        Interrupt::Exit
    } else {
        stop.send_replace(true);
        Interrupt::Stop
    }
}

/// Forwards Ctrl+C as a stop request, checked by the pipeline between samples.
/// A second Ctrl+C terminates the process.
fn spawn_stop_listener() -> anyhow::Result<watch::Receiver<bool>> {
    let (tx, rx) = watch::channel(false);
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    thread::spawn(move || {
        runtime.block_on(async move {
            while signal::ctrl_c().await.is_ok() {
                match handle_interrupt(&tx) {
                    Interrupt::Stop => info!(
                        "Ctrl+C received, stopping after the current sample (press again to exit now)"
                    ),
                    Interrupt::Exit => {
                        warn!("second Ctrl+C received, exiting without waiting for the detector");
                        process::exit(130);
                    }
                }
            }
        });
    });
    Ok(rx)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("-----------------Quick Demo of 3D Detection-------------------------");
    let config = DemoConfig::load_or_default(&args.cfg_file)?;
    let format: SampleFormat = args
        .ext
        .parse()
        .with_context(|| format!("selecting decoder for extension {}", args.ext))?;

    let settings = RunSettings {
        data_root: args.data_root,
        file_number: args.file_number,
        format,
        res: args.res,
        ckpt: args.ckpt,
    };
    let runner = Runner::new(config, settings);
    let stop = spawn_stop_listener()?;

    let summary = runner.execute(Some(stop))?;
    if summary.stopped() {
        info!(
            "Demo stopped early after {} sample(s), {} row(s) written.",
            summary.samples, summary.rows
        );
    } else {
        info!("Demo done.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_interrupt_requests_stop_and_second_exits() {
        let (tx, rx) = watch::channel(false);
        assert_eq!(handle_interrupt(&tx), Interrupt::Stop);
        assert!(*rx.borrow());
        assert_eq!(handle_interrupt(&tx), Interrupt::Exit);
        assert!(*rx.borrow());
    }

    #[test]
    fn interrupt_without_listeners_still_records_stop() {
        let (tx, rx) = watch::channel(false);
        drop(rx);
        assert_eq!(handle_interrupt(&tx), Interrupt::Stop);
        assert_eq!(handle_interrupt(&tx), Interrupt::Exit);
    }
}
