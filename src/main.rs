use clap::Parser;
use eframe::egui;

use label_canvas::app::LabelApp;
use label_canvas::config::Config;
use label_canvas::interaction::Editor;
use label_canvas::session::Session;
use label_canvas::store::FolderStore;

// ── Main ────────────────────────────────────────────────────────────────────

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let config = Config::parse();

    let store = match FolderStore::open(&config.labels_folder) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Cannot use labels folder {}: {e}", config.labels_folder.display());
            std::process::exit(1);
        }
    };
    log::info!("Labels folder: {}", store.root().display());

    let mut session = Session::new(Box::new(store), Editor::new(config.mode, config.handle_size));
    session.refresh_annotation_files();
    if let Some(dir) = &config.images {
        if let Err(e) = session.open_folder(dir) {
            log::error!("Failed to read {}: {e}", dir.display());
            session.alert(format!("Failed to read {}: {e}", dir.display()));
        }
    }

    let title = format!("label-canvas - {}", config.labels_folder.display());
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(LabelApp::new(session)))),
    )
}
