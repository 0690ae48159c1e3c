//! Status adapters exposing native engines through the canonical model.

mod download;
mod upload;

pub use download::DownloadItem;
pub use upload::UploadItem;
