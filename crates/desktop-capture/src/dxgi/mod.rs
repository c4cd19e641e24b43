//! Desktop duplication backend built on DXGI and Direct3D 11.
//!

mod adapters;
mod backend;
mod device;
mod textures;

pub use adapters::list_adapters;
pub use backend::DxgiBackend;

/// A capture session backed by desktop duplication.
pub type DxgiCaptureSession = crate::CaptureSession<DxgiBackend>;
