use core::fmt;

/// A GPU adapter and the outputs attached to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterInfo {
    /// The adapter's enumeration index, used as [`CaptureConfig::adapter_index`](crate::CaptureConfig::adapter_index).
    pub index: u32,

    /// The driver supplied adapter description.
    pub name: String,

    /// The outputs of this adapter in enumeration order.
    pub outputs: Vec<OutputInfo>,
}

/// A display output of an adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputInfo {
    /// The output's enumeration index, used as [`CaptureConfig::monitor_index`](crate::CaptureConfig::monitor_index).
    pub index: u32,

    /// The GDI device name, e.g. `\\.\DISPLAY1`.
    pub device_name: String,

    /// Width of the output's desktop bounds.
    pub width: u32,

    /// Height of the output's desktop bounds.
    pub height: u32,
}

/// Human readable listing of adapters and their outputs.
pub struct AdapterListing<'a>(pub &'a [AdapterInfo]);

impl fmt::Display for AdapterListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for adapter in self.0 {
            writeln!(f, "Adapter Index {}: {}", adapter.index, adapter.name)?;

            for output in &adapter.outputs {
                writeln!(
                    f,
                    "\tMonitor Index {}: {} {}×{}",
                    output.index, output.device_name, output.width, output.height
                )?;
            }

            writeln!(f)?;
        }

        Ok(())
    }
}

/// Converts a nul terminated UTF-16 buffer, as found in DXGI descriptors, into a `String`.
pub fn string_from_wide(buffer: &[u16]) -> String {
    let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..end])
}
