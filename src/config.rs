use std::path::PathBuf;

use clap::Parser;

use crate::interaction::HANDLE_SIZE;
use crate::shape::Mode;

/// Draw boxes and ellipses over a folder of images and save them as labels.
#[derive(Parser, Debug, Clone)]
#[command(name = "label-canvas", version)]
pub struct Config {
    /// Folder holding the `.txt` / `.json` label files (created if missing)
    #[arg(long)]
    pub labels_folder: PathBuf,

    /// Image folder to open at start
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Mode to start in
    #[arg(long, value_enum, default_value_t = Mode::Detection)]
    pub mode: Mode,

    /// Diameter of the resize handles in pixels
    #[arg(long, default_value_t = HANDLE_SIZE)]
    pub handle_size: f32,
}
