use std::{fs::create_dir_all, path::PathBuf};

use super::failure::{Failure, Ignore};

/// Path to the config directory, also home to the logs and snapshots.
pub fn config_dir() -> PathBuf {
    let dir = dirs::config_dir()
        .log_and_panic("The config directory could not be retreived")
        .join("Hyperion Screen Capture");

    create_dir_all(&dir)
        .log("Could not create the config directory")
        .ignore();

    dir
}
