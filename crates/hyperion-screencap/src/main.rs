//! # Hyperion Screen Capture
//! Captures a monitor at a bounded frame rate for ambient lighting.
//!
//! Flags:
//! - `--list-monitors` prints the adapters and monitors that can be captured.
//! - `--snapshot` saves a single frame to the config directory.
//! - `--debug` enables debug logging.
//!

#![allow(clippy::std_instead_of_alloc)]

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use logger::setup_logger;
use tracing::{info, info_span};
use utilities::failure::Failure;

#[cfg_attr(not(windows), allow(dead_code))]
mod capture_loop;
#[cfg_attr(not(windows), allow(dead_code))]
mod config;
mod logger;
mod utilities;

/// The Cargo package version.
#[cfg(not(debug_assertions))]
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The Cargo package version or '0.0.0' if a non-release build.
#[cfg(debug_assertions)]
pub const VERSION: &str = "0.0.0";

/// If the flag was passed on the command line.
fn has_flag(flag: &str) -> bool {
    std::env::args().any(|arg| arg.eq(flag))
}

/// If this instance should have debug enabled.
pub fn should_debug() -> bool {
    has_flag("--debug")
}

fn main() {
    // Set up logger
    let _logger_guards = setup_logger(should_debug()).log_and_panic("Could not set up the logger");

    // Log application start
    let _span = info_span!("[Main Thread]").entered();
    info!("Hyperion Screen Capture v{}", VERSION);

    #[cfg(windows)]
    windows_main::run();

    #[cfg(not(windows))]
    tracing::error!("Exiting: desktop duplication is only available on Windows.");
}

#[cfg(windows)]
mod windows_main {
    use core::time::Duration;

    use desktop_capture::{AdapterListing, DxgiCaptureSession, list_adapters};
    use tracing::{error, info, warn};

    use crate::{
        capture_loop,
        config::Config,
        has_flag,
        utilities::{
            directories::config_dir,
            failure::{Failure, Ignore},
            windows_helpers::{is_first_instance, set_dpi_awareness},
        },
    };

    const SNAPSHOT_FILE_NAME: &str = "snapshot.png";

    pub fn run() {
        set_dpi_awareness().log_and_panic("Could not make the process DPI aware");

        if has_flag("--list-monitors") {
            print!("{}", AdapterListing(&list_adapters()));
            return;
        }

        // Ensure this instance is the first instance running.
        {
            let is_first_instance = is_first_instance()
                .log_and_panic("Could not check if Hyperion Screen Capture was already running");

            if !is_first_instance {
                warn!("Exiting: Hyperion Screen Capture is already running.");
                return;
            }
        }

        // Load config
        let config = match Config::try_load_config() {
            Ok(Some(config)) => config,

            Ok(None) => {
                info!("Creating the default config file.");
                let config = Config::default();
                config.save();
                config
            }

            Err(error) => {
                warn!(
                    "Could not deserialize config file, using the defaults:\n{error}\nFix or delete {} to change the settings.",
                    Config::file_path().display()
                );
                Config::default()
            }
        };

        let mut session = DxgiCaptureSession::new(config.capture);
        if let Err(e) = session.initialize() {
            error!("Exiting: Could not start capturing:\n{e}");
            return;
        }

        if has_flag("--snapshot") {
            capture_loop::save_snapshot(&mut session, &config_dir().join(SNAPSHOT_FILE_NAME))
                .log("Could not save a snapshot")
                .ignore();
            return;
        }

        let report_interval = Duration::from_secs(config.report_interval_secs);
        if let Err(e) = capture_loop::run(&mut session, report_interval) {
            error!("Exiting: Capture failed:\n{e}");
        }
    }
}
