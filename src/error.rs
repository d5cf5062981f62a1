// Error types for lamp-viewer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("glTF document contains no scene")]
    EmptyDocument,

    #[error("model load task failed: {0}")]
    LoadTask(#[from] tokio::task::JoinError),

    #[error("lamp node {0:?} not found in model")]
    LampNodeMissing(String),

    #[error("lamp node {0:?} has no child carrying a material")]
    LampMaterialMissing(String),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window error: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
