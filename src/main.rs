use std::path::PathBuf;
use std::process::ExitCode;

use dicom_stack::{TitleStyle, VolumeLoader};
use log::{error, info};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let directory = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dicom"));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("should have started the tokio runtime");
    let loaded = runtime.block_on(VolumeLoader::default().build_volume_async(&directory));
    // a timed out decode keeps its blocking thread, dropping the runtime would wait for it
    runtime.shutdown_background();

    let (volume, metadata) = match loaded {
        Ok(loaded) => loaded,
        Err(err) => {
            error!("Could not load {}: {err}", directory.display());
            return ExitCode::FAILURE;
        }
    };

    for (index, slice_metadata) in metadata.iter().enumerate() {
        info!("{}", slice_metadata.title(index + 1, TitleStyle::SingleLine));
    }

    let image = volume
        .slice_image(volume.len() / 2)
        .expect("should have returned image at center of volume");
    image
        .save("result.png")
        .expect("should have saved the center slice");
    ExitCode::SUCCESS
}
