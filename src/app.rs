use eframe::egui;

use crate::render;
use crate::session::{Command, Session};

// ── App ─────────────────────────────────────────────────────────────────────

pub struct LabelApp {
    session: Session,
}

impl LabelApp {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    fn pick_folder(&mut self) {
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };
        match self.session.open_folder(&dir) {
            Ok(0) => self.session.alert(format!("No images in {}", dir.display())),
            Ok(_) => {}
            Err(e) => {
                log::error!("Failed to read {}: {e}", dir.display());
                self.session.alert(format!("Failed to read {}: {e}", dir.display()));
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let commands: Vec<Command> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        repeat: false,
                        modifiers,
                        ..
                    } if !modifiers.ctrl && !modifiers.command => Command::from_key(*key),
                    _ => None,
                })
                .collect()
        });
        for command in commands {
            self.session.run(command);
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format!("Mode: {}", self.session.editor.mode.label()));
            ui.separator();
            ui.label("Class:");
            ui.add(egui::DragValue::new(&mut self.session.editor.class_id).range(0..=999));
            ui.separator();
            if ui.button("Save (s)").clicked() {
                self.session.run(Command::Save);
            }
            if ui.button("Next (n)").clicked() {
                self.session.run(Command::NextImage);
            }
            if ui.button("Save + next (m)").clicked() {
                self.session.run(Command::SaveAndNext);
            }
            if ui.button("Toggle mode (e)").clicked() {
                self.session.run(Command::ToggleMode);
            }
            if self.session.editor.annotations.draft().is_some() && ui.button("Commit (d)").clicked() {
                self.session.run(Command::CommitDraft);
            }
            ui.separator();
            ui.label(self.cursor_text());
            if !self.session.status().is_empty() {
                ui.separator();
                ui.weak(self.session.status());
            }
        });
    }

    fn cursor_text(&self) -> String {
        let viewport = self.session.viewport();
        match self.session.editor.pointer() {
            Some(p) if viewport.contains(p) => {
                let [x, y] = viewport.to_normalized(p);
                format!("Cursor: (x: {x:.6}, y: {y:.6})")
            }
            _ => "Cursor: outside image".to_string(),
        }
    }

    fn file_lists(&mut self, ui: &mut egui::Ui) {
        if ui.button("Open folder…").clicked() {
            self.pick_folder();
        }
        ui.separator();

        let mut open_image = None;
        let mut open_labels = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.heading("Image Files");
            let current = self.session.current_index();
            for (index, entry) in self.session.images().iter().enumerate() {
                if ui.selectable_label(current == Some(index), entry.name.as_str()).clicked() {
                    open_image = Some(index);
                }
            }
            ui.separator();
            ui.heading("Annotation Files");
            for name in self.session.annotation_files() {
                if ui.selectable_label(false, name.as_str()).clicked() {
                    open_labels = Some(name.clone());
                }
            }
        });

        if let Some(index) = open_image {
            self.session.open_image(index);
        }
        if let Some(name) = open_labels {
            self.session.open_annotation_file(&name);
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let canvas_rect = response.rect;
        render::draw_background(&painter, canvas_rect);

        self.session.set_canvas(canvas_rect);
        let Some(texture) = self.session.image_mut().map(|image| image.texture(ctx)) else {
            return;
        };

        if response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(origin) = ctx.input(|i| i.pointer.press_origin()) {
                self.session.pointer_down(origin);
            }
        }
        match response.hover_pos().or_else(|| response.interact_pointer_pos()) {
            Some(pos) => self.session.pointer_move(pos),
            None => self.session.editor.pointer_left(),
        }
        if response.drag_stopped_by(egui::PointerButton::Primary) {
            self.session.pointer_up();
        }
        if response.clicked_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                self.session.pointer_click(pos);
            }
        }

        let viewport = *self.session.viewport();
        render::draw_scene(&painter, &viewport, texture, &self.session.editor);
        if let Some(pointer) = self.session.editor.pointer().filter(|p| viewport.contains(*p)) {
            render::draw_crosshair(&painter, &viewport, pointer);
        }
    }

    fn alert_window(&mut self, ctx: &egui::Context) {
        let Some(message) = self.session.current_alert().map(str::to_owned) else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    dismissed = true;
                }
            });
        if dismissed {
            self.session.dismiss_alert();
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for LabelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.session.current_alert().is_none() {
            self.handle_keys(ctx);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));

        egui::SidePanel::left("files")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| self.file_lists(ui));

        egui::SidePanel::right("annotations")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Annotations");
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.monospace(self.session.panel());
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ui, ctx));

        self.alert_window(ctx);
    }
}
