use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raw::types::RawImageData;

pub trait RawImageReader {
    fn read_raw(&self, data: &[u8]) -> Result<RawImageData>;

    fn read_raw_file(&self, path: &std::path::Path) -> Result<RawImageData> {
        let bytes = std::fs::read(path).map_err(|e| {
            crate::image_pipeline::RawProcError::InputReadError(format!("{}: {}", path.display(), e))
        })?;
        self.read_raw(&bytes)
    }
}
