use std::{fs, io::Read, path::PathBuf};

use desktop_capture::CaptureConfig;
use serde::{Deserialize, Serialize};

use crate::utilities::{
    directories::config_dir,
    failure::{Failure, log_and_panic},
};

const FILE_NAME: &str = "capture-config.toml";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,

    /// Seconds between capture statistics in the log, `0` disables them.
    pub report_interval_secs: u64,
}

impl Config {
    pub fn try_load_config() -> Result<Option<Self>, toml::de::Error> {
        let mut file = match fs::File::open(Self::file_path()) {
            Ok(file) => file,
            Err(error) => {
                if error.kind() == std::io::ErrorKind::NotFound {
                    return Ok(None);
                }

                log_and_panic(
                    error,
                    "Could not check if an existing configuration file exists",
                );
            }
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .log_and_panic("Could not read the existing configuration file");

        Self::from_toml(&contents).map(Some)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn save(&self) {
        let toml_string =
            toml::to_string_pretty(self).log_and_panic("Could not save the configuration file");

        fs::write(Self::file_path(), toml_string.as_bytes())
            .log_and_panic("Could not save the configuration file");
    }

    pub fn file_path() -> PathBuf {
        config_dir().join(FILE_NAME)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            report_interval_secs: 10,
        }
    }
}
