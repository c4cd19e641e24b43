pub mod directories;
pub mod failure;
#[cfg(windows)]
pub mod windows_helpers;
