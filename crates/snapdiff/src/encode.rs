use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;

use crate::error::DiffError;

/// Where an encoded diff raster goes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ArtifactTarget {
    /// Inline `data:image/png;base64,...`.
    #[default]
    DataUrl,
    /// PNG written to this path; the path is the returned reference.
    File(PathBuf),
}

/// Lossless PNG bytes of `raster`.
pub fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>, DiffError> {
    let mut png = Vec::new();
    raster
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| DiffError::Encode(e.to_string()))?;
    Ok(png)
}

pub fn to_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Serialize `raster` and return a reference the loader can read back.
pub fn encode(raster: &RgbaImage, target: &ArtifactTarget) -> Result<String, DiffError> {
    publish(&encode_png(raster)?, target)
}

/// Hand already-encoded PNG bytes to `target`.
///
/// Files are written next to their final path and renamed into place, so
/// readers never see a partial artifact.
pub fn publish(png: &[u8], target: &ArtifactTarget) -> Result<String, DiffError> {
    match target {
        ArtifactTarget::DataUrl => Ok(to_data_url(png)),
        ArtifactTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DiffError::Encode(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
            let staging = path.with_extension("png.partial");
            std::fs::write(&staging, png).map_err(|e| {
                DiffError::Encode(format!("failed to write {}: {e}", staging.display()))
            })?;
            std::fs::rename(&staging, path).map_err(|e| {
                DiffError::Encode(format!("failed to move {} into place: {e}", path.display()))
            })?;
            Ok(path.to_string_lossy().into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::{ImageRef, Loader, decode, decode_data_url};
    use image::Rgba;

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(7, 5, |x, y| {
            if (x + y) % 2 == 0 { Rgba([255, 0, 255, 255]) } else { Rgba([10, 20, 30, 77]) }
        })
    }

    #[test]
    fn data_url_round_trips_pixels() {
        let raster = checker();
        let url = encode(&raster, &ArtifactTarget::DataUrl).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let decoded = decode(&decode_data_url(&url).unwrap()).unwrap();
        assert_eq!(decoded, raster);
        assert_eq!(encode(&decoded, &ArtifactTarget::DataUrl).unwrap(), url);
    }

    #[tokio::test]
    async fn file_artifact_is_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/diff.png");
        let raster = checker();
        let reference = encode(&raster, &ArtifactTarget::File(path.clone())).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("png.partial").exists());

        let loader = Loader::new(std::time::Duration::from_secs(1)).unwrap();
        let back = loader.load(&ImageRef::parse(&reference)).await.unwrap();
        assert_eq!(back, raster);
    }
}
