use hovermouse::domain::settings::SettingsService;
use hovermouse::infrastructure::bluetooth::profile::ServiceDescriptor;
use hovermouse::infrastructure::{frames, logging};
use hovermouse::supervisor::Supervisor;
use std::env;
use tracing::{error, info};

fn main() {
    let args: Vec<String> = env::args().collect();

    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        std::process::exit(2);
    };

    let result = match command {
        "run" => run_command(),
        "descriptor" => descriptor_command(),
        _ => {
            print_usage();
            Err(anyhow::anyhow!("unknown command `{command}`"))
        }
    };

    if let Err(err) = result {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage: hovermouse <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run          Advertise as a Bluetooth HID device and translate");
    eprintln!("               landmark frames from stdin into input reports");
    eprintln!("  descriptor   Print the SDP service record and exit");
}

/// Run as the HID device: the only externally meaningful mode.
fn run_command() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let _logging_guard = logging::init_logger(&settings.log_settings)?;
    info!("Starting Hover Mouse HID device");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received");
                let _ = shutdown_tx.send(true);
            }
        });

        let frames_rx = frames::spawn_stdin_source();
        let supervisor = Supervisor::new(&settings, frames_rx, shutdown_rx);
        if let Err(err) = supervisor.run().await {
            error!("supervisor failed: {err:#}");
            return Err(err);
        }
        Ok(())
    })
}

/// Dump the SDP record for inspection against sdptool output.
fn descriptor_command() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let descriptor = ServiceDescriptor::hid_combo(&settings_service.get().device_name);
    println!("{}", descriptor.sdp_record_xml());
    Ok(())
}
