//! The editing session: image folder, open image, editor and label store.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use egui::{vec2, Pos2, Rect};
use image::RgbaImage;

use crate::error::{SessionError, StoreError};
use crate::format::{self, ImageMeta};
use crate::interaction::{Editor, Outcome};
use crate::shape::{Mode, Shape};
use crate::store::AnnotationStore;
use crate::viewport::Viewport;

// ── Commands ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Save,
    NextImage,
    SaveAndNext,
    ToggleMode,
    CommitDraft,
    Cancel,
}

impl Command {
    pub fn from_key(key: egui::Key) -> Option<Self> {
        match key {
            egui::Key::S => Some(Command::Save),
            egui::Key::N => Some(Command::NextImage),
            egui::Key::M => Some(Command::SaveAndNext),
            egui::Key::E => Some(Command::ToggleMode),
            egui::Key::D => Some(Command::CommitDraft),
            egui::Key::Escape => Some(Command::Cancel),
            _ => None,
        }
    }
}

// ── Images ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub name: String,
}

impl ImageEntry {
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

/// File name without its last extension.
pub fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

pub struct OpenImage {
    pub index: usize,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pixels: RgbaImage,
    texture: Option<egui::TextureHandle>,
}

impl OpenImage {
    pub fn label_file(&self, mode: Mode) -> String {
        format!("{}.{}", base_name(&self.name), mode.extension())
    }

    pub fn texture(&mut self, ctx: &egui::Context) -> egui::TextureId {
        let pixels = &self.pixels;
        self.texture
            .get_or_insert_with(|| {
                let size = [pixels.width() as usize, pixels.height() as usize];
                let color_image =
                    egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_flat_samples().as_slice());
                ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR)
            })
            .id()
    }
}

// ── Session ─────────────────────────────────────────────────────────────────

pub struct Session {
    store: Box<dyn AnnotationStore>,
    images: Vec<ImageEntry>,
    image: Option<OpenImage>,
    pub editor: Editor,
    viewport: Viewport,
    annotation_files: Vec<String>,
    panel: String,
    status: String,
    alerts: VecDeque<String>,
}

impl Session {
    pub fn new(store: Box<dyn AnnotationStore>, editor: Editor) -> Self {
        Self {
            store,
            images: Vec::new(),
            image: None,
            editor,
            viewport: Viewport::EMPTY,
            annotation_files: Vec::new(),
            panel: String::new(),
            status: String::new(),
            alerts: VecDeque::new(),
        }
    }

    pub fn images(&self) -> &[ImageEntry] {
        &self.images
    }

    pub fn image(&self) -> Option<&OpenImage> {
        self.image.as_ref()
    }

    pub fn image_mut(&mut self) -> Option<&mut OpenImage> {
        self.image.as_mut()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.image.as_ref().map(|i| i.index)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn annotation_files(&self) -> &[String] {
        &self.annotation_files
    }

    /// Live serialization of the committed shapes.
    pub fn panel(&self) -> &str {
        &self.panel
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        self.alerts.push_back(message.into());
    }

    pub fn current_alert(&self) -> Option<&str> {
        self.alerts.front().map(String::as_str)
    }

    pub fn dismiss_alert(&mut self) {
        self.alerts.pop_front();
    }

    /// Re-letterboxes the open image into `canvas`.
    pub fn set_canvas(&mut self, canvas: Rect) {
        self.viewport = match &self.image {
            Some(image) => Viewport::fit(canvas, vec2(image.width as f32, image.height as f32)),
            None => Viewport::EMPTY,
        };
    }

    /// Lists the images in `dir` in natural order. Returns how many were found.
    pub fn open_folder(&mut self, dir: &Path) -> Result<usize, SessionError> {
        let mut images = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || image::ImageFormat::from_path(&path).is_err() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) {
                images.push(ImageEntry { path, name });
            }
        }
        images.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        log::info!("Found {} images in {}", images.len(), dir.display());

        self.images = images;
        self.image = None;
        self.editor.reset();
        self.refresh_panel();
        Ok(self.images.len())
    }

    /// Opens image `index` in the current mode. Returns false if nothing opened.
    pub fn open_image(&mut self, index: usize) -> bool {
        self.open_image_in(index, self.editor.mode)
    }

    /// Nothing about the session changes until the image has decoded.
    fn open_image_in(&mut self, index: usize, mode: Mode) -> bool {
        let Some(entry) = self.images.get(index) else {
            return false;
        };
        let pixels = match image::open(&entry.path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                log::error!("Failed to open {}: {e}", entry.path.display());
                let message = format!("Failed to open {}: {e}", entry.name);
                self.alert(message);
                return false;
            }
        };
        log::info!("Opened {} ({} x {})", entry.name, pixels.width(), pixels.height());
        self.image = Some(OpenImage {
            index,
            name: entry.name.clone(),
            width: pixels.width(),
            height: pixels.height(),
            pixels,
            texture: None,
        });
        self.editor.mode = mode;
        self.load_annotations();
        true
    }

    pub fn run(&mut self, command: Command) {
        match command {
            Command::Save => {
                self.save();
            }
            Command::NextImage => self.next_image(),
            Command::SaveAndNext => {
                self.save();
                self.next_image();
            }
            Command::ToggleMode => self.toggle_mode(),
            Command::CommitDraft => {
                let outcome = self.editor.commit_draft();
                self.after(outcome);
            }
            Command::Cancel => {
                self.editor.cancel();
            }
        }
    }

    pub fn next_image(&mut self) {
        let next = self.current_index().map_or(0, |i| i + 1);
        if next < self.images.len() {
            self.open_image(next);
        } else {
            self.alert("No more images.");
        }
    }

    pub fn toggle_mode(&mut self) {
        self.editor.mode = self.editor.mode.toggled();
        log::info!("Switched to {} mode", self.editor.mode.label());
        self.status = format!("Switched to {} mode", self.editor.mode.label());
        self.load_annotations();
    }

    /// Writes the committed shapes in the current mode's format.
    pub fn save(&mut self) -> bool {
        match self.try_save() {
            Ok(filename) => {
                log::info!("Saved {filename}");
                self.status = format!("Saved {filename}");
                self.refresh_annotation_files();
                true
            }
            Err(e) => {
                log::error!("Failed to save annotation: {e}");
                self.alert(format!("Failed to save annotation: {e}"));
                false
            }
        }
    }

    fn try_save(&self) -> Result<String, SessionError> {
        let image = self.image.as_ref().ok_or(SessionError::NoImageOpen)?;
        let mode = self.editor.mode;
        let shapes = self.editor.annotations.shapes();
        let content = match mode {
            Mode::Detection => format::encode_detection(shapes),
            Mode::Segmentation => format::encode_segmentation(
                shapes,
                &ImageMeta {
                    file_name: &image.name,
                    width: image.width,
                    height: image.height,
                },
            )?,
        };
        let filename = image.label_file(mode);
        self.store.write(&filename, &content)?;
        Ok(filename)
    }

    /// Opens the image a label file belongs to, in the file's mode.
    pub fn open_annotation_file(&mut self, filename: &str) {
        if let Err(e) = self.try_open_annotation_file(filename) {
            log::warn!("Cannot open {filename}: {e}");
            self.alert(e.to_string());
        }
    }

    fn try_open_annotation_file(&mut self, filename: &str) -> Result<(), SessionError> {
        let mode = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Mode::from_extension)
            .ok_or_else(|| StoreError::InvalidExtension(filename.to_string()))?;
        let stem = base_name(filename);
        let index = self
            .images
            .iter()
            .position(|entry| entry.base_name() == stem)
            .ok_or_else(|| SessionError::NoMatchingImage(filename.to_string()))?;
        self.open_image_in(index, mode);
        Ok(())
    }

    pub fn refresh_annotation_files(&mut self) {
        match self.store.list() {
            Ok(mut files) => {
                files.sort_by(|a, b| natural_cmp(a, b));
                self.annotation_files = files;
            }
            Err(e) => log::error!("Error fetching annotation files: {e}"),
        }
    }

    /// Replaces the shapes with the open image's labels for the current mode.
    /// Any failure leaves the image without shapes.
    fn load_annotations(&mut self) {
        let shapes = match self.read_annotations() {
            Ok(shapes) => shapes,
            Err(SessionError::NoImageOpen) => Vec::new(),
            Err(SessionError::Store(StoreError::NotFound(name))) => {
                log::debug!("No labels yet: {name}");
                Vec::new()
            }
            Err(e) => {
                log::error!("Failed to load annotations: {e}");
                Vec::new()
            }
        };
        self.editor.load(shapes);
        self.refresh_panel();
    }

    fn read_annotations(&self) -> Result<Vec<Shape>, SessionError> {
        let image = self.image.as_ref().ok_or(SessionError::NoImageOpen)?;
        let text = self.store.read(&image.label_file(self.editor.mode))?;
        let shapes = match self.editor.mode {
            Mode::Detection => format::decode_detection(&text)?,
            Mode::Segmentation => format::decode_segmentation(&text, image.width, image.height)?,
        };
        Ok(shapes)
    }

    fn refresh_panel(&mut self) {
        self.panel = format::panel_text(self.editor.mode, self.editor.annotations.shapes());
    }

    fn after(&mut self, outcome: Outcome) {
        if outcome == Outcome::Committed {
            self.refresh_panel();
        }
    }

    // ── Pointer ─────────────────────────────────────────────────────────────

    pub fn pointer_click(&mut self, pos: Pos2) {
        let outcome = self.editor.click(&self.viewport, pos);
        self.after(outcome);
    }

    pub fn pointer_down(&mut self, pos: Pos2) {
        self.editor.pointer_down(&self.viewport, pos);
    }

    pub fn pointer_move(&mut self, pos: Pos2) {
        self.editor.pointer_move(&self.viewport, pos);
    }

    pub fn pointer_up(&mut self) {
        self.editor.pointer_up();
    }
}

// ── Ordering ────────────────────────────────────────────────────────────────

/// Case-insensitive ordering that compares digit runs by value, so `img2`
/// sorts before `img10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);
    for (x, y) in left.iter().zip(&right) {
        let ord = compare_chunk(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

fn chunks(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_digit = None;
    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        if prev_digit.is_some_and(|p| p != digit) {
            out.push(&s[start..i]);
            start = i;
        }
        prev_digit = Some(digit);
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out
}

fn compare_chunk(x: &str, y: &str) -> Ordering {
    let is_number = |s: &str| s.starts_with(|c: char| c.is_ascii_digit());
    if is_number(x) && is_number(y) {
        let x = x.trim_start_matches('0');
        let y = y.trim_start_matches('0');
        x.len().cmp(&y.len()).then_with(|| x.cmp(y))
    } else {
        x.to_lowercase().cmp(&y.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use egui::pos2;

    use super::*;
    use crate::interaction::HANDLE_SIZE;
    use crate::shape::ShapeKind;
    use crate::store::FolderStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        images: PathBuf,
        labels: FolderStore,
    }

    /// Three 40 x 20 images and an empty labels folder.
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        for name in ["img10.png", "img2.png", "Img1.png"] {
            RgbaImage::new(40, 20).save(images.join(name)).unwrap();
        }
        std::fs::write(images.join("readme.txt"), "not an image").unwrap();
        let labels = FolderStore::open(dir.path().join("labels")).unwrap();
        Fixture {
            _dir: dir,
            images,
            labels,
        }
    }

    fn session(fx: &Fixture, mode: Mode) -> Session {
        let mut session = Session::new(Box::new(fx.labels.clone()), Editor::new(mode, HANDLE_SIZE));
        session.open_folder(&fx.images).unwrap();
        session
    }

    /// Shows the image 1:1 at the canvas origin.
    fn show(session: &mut Session) {
        session.set_canvas(Rect::from_min_size(Pos2::ZERO, vec2(40.0, 20.0)));
    }

    struct BrokenStore;

    impl AnnotationStore for BrokenStore {
        fn list(&self) -> Result<Vec<String>, StoreError> {
            Err(std::io::Error::other("offline").into())
        }
        fn read(&self, _: &str) -> Result<String, StoreError> {
            Err(std::io::Error::other("offline").into())
        }
        fn write(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(std::io::Error::other("offline").into())
        }
    }

    #[test]
    fn natural_order_ignores_case_and_compares_numbers() {
        let mut names = vec!["img10.png", "img2.png", "Img1.png", "img02b.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["Img1.png", "img2.png", "img02b.png", "img10.png"]);
        assert_eq!(base_name("a.b.png"), "a.b");
    }

    #[test]
    fn folder_lists_only_images_in_natural_order() {
        let fx = fixture();
        let session = session(&fx, Mode::Detection);
        let names: Vec<&str> = session.images().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Img1.png", "img2.png", "img10.png"]);
        assert!(session.image().is_none());
    }

    #[test]
    fn drawn_box_is_saved_as_a_detection_file() {
        let fx = fixture();
        let mut session = session(&fx, Mode::Detection);
        session.open_image(0);
        show(&mut session);

        session.pointer_click(pos2(10.0, 5.0));
        session.pointer_click(pos2(30.0, 15.0));
        assert_eq!(session.panel(), "0 0.500000 0.500000 0.500000 0.500000");

        assert!(session.save());
        assert_eq!(
            fx.labels.read("Img1.txt").unwrap(),
            "0 0.500000 0.500000 0.500000 0.500000"
        );
        assert_eq!(session.annotation_files(), ["Img1.txt"]);
        assert!(session.current_alert().is_none());
    }

    #[test]
    fn existing_labels_load_when_the_image_opens() {
        let fx = fixture();
        fx.labels.write("img2.txt", "3 0.5 0.5 0.2 0.2\n1 0.1 0.1 0.1 0.1\n").unwrap();
        let mut session = session(&fx, Mode::Detection);
        session.open_image(1);

        let shapes = session.editor.annotations.shapes();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].class_id, 3);
        assert!(session.panel().starts_with("3 0.500000"));
    }

    #[test]
    fn toggling_mode_reloads_in_the_other_format() {
        let fx = fixture();
        let ellipse = Shape::new(ShapeKind::Ellipse, 2, 0.5, 0.5, 0.5, 0.5);
        let json = format::encode_segmentation(
            &[ellipse],
            &ImageMeta {
                file_name: "Img1.png",
                width: 40,
                height: 20,
            },
        )
        .unwrap();
        fx.labels.write("Img1.json", &json).unwrap();
        fx.labels.write("Img1.txt", "0 0.5 0.5 0.1 0.1").unwrap();

        let mut session = session(&fx, Mode::Detection);
        session.open_image(0);
        assert_eq!(session.editor.annotations.shapes()[0].kind, ShapeKind::Box);

        session.run(Command::ToggleMode);
        assert_eq!(session.editor.mode, Mode::Segmentation);
        let shapes = session.editor.annotations.shapes();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].kind, ShapeKind::Ellipse);
        assert_eq!(shapes[0].class_id, 2);
        assert!(session.panel().contains("\"classId\": 2"));
    }

    #[test]
    fn ellipse_draft_commits_and_saves_as_coco() {
        let fx = fixture();
        let mut session = session(&fx, Mode::Segmentation);
        session.open_image(0);
        show(&mut session);

        session.pointer_click(pos2(10.0, 5.0));
        session.pointer_click(pos2(30.0, 15.0));
        assert!(session.editor.annotations.draft().is_some());
        assert_eq!(session.panel(), "[]");

        session.run(Command::CommitDraft);
        assert_eq!(session.editor.annotations.len(), 1);
        session.run(Command::Save);

        let saved = fx.labels.read("Img1.json").unwrap();
        let value: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(value["images"][0]["file_name"], "Img1.png");
        assert_eq!(value["annotations"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn malformed_labels_leave_the_image_empty() {
        let fx = fixture();
        fx.labels.write("Img1.txt", "garbage line").unwrap();
        let mut session = session(&fx, Mode::Detection);
        session.open_image(0);
        assert!(session.editor.annotations.is_empty());
        assert_eq!(session.panel(), "");
        assert!(session.current_alert().is_none());
    }

    #[test]
    fn next_walks_the_folder_and_alerts_at_the_end() {
        let fx = fixture();
        let mut session = session(&fx, Mode::Detection);
        session.run(Command::NextImage);
        assert_eq!(session.current_index(), Some(0));
        session.run(Command::NextImage);
        session.run(Command::NextImage);
        assert_eq!(session.current_index(), Some(2));

        session.run(Command::NextImage);
        assert_eq!(session.current_index(), Some(2));
        assert_eq!(session.current_alert(), Some("No more images."));
        session.dismiss_alert();
        assert!(session.current_alert().is_none());
    }

    #[test]
    fn save_and_next_writes_then_advances() {
        let fx = fixture();
        let mut session = session(&fx, Mode::Detection);
        session.open_image(0);
        session.run(Command::SaveAndNext);
        assert_eq!(fx.labels.read("Img1.txt").unwrap(), "");
        assert_eq!(session.current_index(), Some(1));
    }

    #[test]
    fn annotation_file_opens_its_image_in_its_mode() {
        let fx = fixture();
        fx.labels.write("img10.json", r#"{"annotations": []}"#).unwrap();
        let mut session = session(&fx, Mode::Detection);

        session.open_annotation_file("img10.json");
        assert_eq!(session.current_index(), Some(2));
        assert_eq!(session.editor.mode, Mode::Segmentation);

        session.open_annotation_file("missing.txt");
        assert_eq!(session.current_alert(), Some("No image matches missing.txt"));
        assert_eq!(session.current_index(), Some(2));
    }

    #[test]
    fn unreadable_image_keeps_the_open_image_and_its_mode() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        RgbaImage::new(40, 20).save(images.join("a.png")).unwrap();
        std::fs::write(images.join("b.png"), "not a png").unwrap();
        let labels = FolderStore::open(dir.path().join("labels")).unwrap();

        let ellipse = Shape::new(ShapeKind::Ellipse, 3, 0.5, 0.5, 0.5, 0.5);
        let meta = ImageMeta {
            file_name: "a.png",
            width: 40,
            height: 20,
        };
        let a_json = format::encode_segmentation(&[ellipse], &meta).unwrap();
        labels.write("a.json", &a_json).unwrap();
        labels.write("a.txt", "1 0.5 0.5 0.2 0.2").unwrap();
        labels.write("b.json", r#"{"annotations": []}"#).unwrap();

        let mut session = Session::new(Box::new(labels.clone()), Editor::new(Mode::Detection, HANDLE_SIZE));
        session.open_folder(&images).unwrap();
        assert!(session.open_image(0));
        let panel = session.panel().to_string();

        session.open_annotation_file("b.json");
        assert!(session.current_alert().unwrap().starts_with("Failed to open b.png"));
        assert_eq!(session.editor.mode, Mode::Detection);
        assert_eq!(session.image().map(|i| i.name.as_str()), Some("a.png"));
        let shapes = session.editor.annotations.shapes();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].kind, ShapeKind::Box);
        assert_eq!(session.panel(), panel);

        assert!(session.save());
        assert_eq!(labels.read("a.json").unwrap(), a_json);
        assert_eq!(labels.read("a.txt").unwrap(), "1 0.500000 0.500000 0.200000 0.200000");
    }

    #[test]
    fn save_failures_alert() {
        let fx = fixture();
        let mut session = Session::new(Box::new(BrokenStore), Editor::new(Mode::Detection, HANDLE_SIZE));
        session.open_folder(&fx.images).unwrap();

        assert!(!session.save());
        assert_eq!(session.current_alert(), Some("Failed to save annotation: No image is open"));
        session.dismiss_alert();

        // Loading through a broken store is silent.
        session.open_image(0);
        assert!(session.current_alert().is_none());
        assert!(!session.save());
        assert!(session.current_alert().unwrap().contains("offline"));
    }

    #[test]
    fn escape_cancels_an_open_box() {
        let fx = fixture();
        let mut session = session(&fx, Mode::Detection);
        session.open_image(0);
        show(&mut session);
        session.pointer_click(pos2(10.0, 5.0));
        session.run(Command::Cancel);
        session.pointer_click(pos2(30.0, 15.0));
        assert!(session.editor.annotations.is_empty());
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(Command::from_key(egui::Key::M), Some(Command::SaveAndNext));
        assert_eq!(Command::from_key(egui::Key::Escape), Some(Command::Cancel));
        assert_eq!(Command::from_key(egui::Key::Q), None);
    }
}
