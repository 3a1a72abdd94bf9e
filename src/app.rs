//! Main application UI and state management.
//! Handles deck management, the simulated calendar and review sessions.

use chrono::{DateTime, Local, Utc};
use eframe::egui;
use palavras::config::AppConfig;
use palavras::database::db;
use palavras::export::json::{export_json_to_path, import_json, save_imported_deck};
use palavras::models::sm2::{format_interval, preview_intervals, quality_label};
use palavras::models::{
    DeckSet, Flashcard, Grade, ReviewError, ReviewSession, ReviewStats, SessionMode,
    SessionPhase, SessionRequest,
};
use palavras::SqliteRepository;

/// Application screen states
#[derive(Default)]
enum AppScreen {
    #[default]
    Main,
    Review,
}

/// Something the learner clicked on the review screen, applied after rendering
enum ReviewAction {
    Flip,
    Grade(u8),
    Next,
    Previous,
    Back,
}

/// Main application state
pub struct MyApp {
    config: AppConfig,
    repo: SqliteRepository,

    show_confirmation_dialog: bool,
    allowed_to_close: bool,
    all_decks: DeckSet,
    due_counts: Vec<usize>,
    selected_deck_index: Option<usize>,
    current_term: String,
    current_definition: String,
    new_deck_name: String,
    session_mode: SessionMode,

    current_screen: AppScreen,
    session: Option<ReviewSession>,
    /// Whether the English side of the current card is visible
    show_back: bool,
    status_message: Option<String>,

    today: DateTime<Utc>,
    stats: ReviewStats,

    show_export_dialog: bool,
    show_import_result_dialog: bool,
    import_result_message: String,
}

/// Formats a timestamp as a local YYYY-MM-DD string
fn format_date(time: DateTime<Utc>) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d").to_string()
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.current_screen {
            AppScreen::Main => self.render_main_screen(ctx),
            AppScreen::Review => self.render_review_screen(ctx),
        }

        // Handle window close requests with confirmation dialog
        if ctx.input(|i| i.viewport().close_requested()) && !self.allowed_to_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.show_confirmation_dialog = true;
        }

        if self.show_confirmation_dialog {
            egui::Window::new("Do you want to quit?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("No").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = false;
                        }

                        if ui.button("Yes").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = true;
                            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
        }

        if self.show_export_dialog {
            let mut export_deck_index: Option<usize> = None;
            let mut should_cancel = false;

            egui::Window::new("Export Deck")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label("Select a deck to export:");
                    ui.separator();

                    for (i, deck) in self.all_decks.decks.iter().enumerate() {
                        if ui
                            .button(format!("{} ({} cards)", deck.name, deck.flashcards.len()))
                            .clicked()
                        {
                            export_deck_index = Some(i);
                        }
                    }

                    ui.separator();

                    if ui.button("Cancel").clicked() {
                        should_cancel = true;
                    }
                });

            if let Some(i) = export_deck_index {
                self.handle_export(i);
            }
            if should_cancel {
                self.show_export_dialog = false;
            }
        }

        if self.show_import_result_dialog {
            egui::Window::new("Import/Export Result")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(&self.import_result_message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.show_import_result_dialog = false;
                    }
                });
        }
    }
}

impl MyApp {
    pub fn new(config: AppConfig, deck_set: DeckSet, repo: SqliteRepository) -> Self {
        let selected_deck_index = if deck_set.decks.is_empty() { None } else { Some(0) };
        let session_mode = config.default_mode;
        let mut app = Self {
            config,
            repo,
            show_confirmation_dialog: false,
            allowed_to_close: false,
            all_decks: deck_set,
            due_counts: Vec::new(),
            selected_deck_index,
            current_term: String::new(),
            current_definition: String::new(),
            new_deck_name: String::new(),
            session_mode,
            current_screen: AppScreen::Main,
            session: None,
            show_back: false,
            status_message: None,
            today: Utc::now(),
            stats: ReviewStats::default(),
            show_export_dialog: false,
            show_import_result_dialog: false,
            import_result_message: String::new(),
        };
        app.refresh();
        app
    }

    /// Re-reads the simulated date, due counts and review statistics
    fn refresh(&mut self) {
        if let Err(e) = self.try_refresh() {
            log::warn!("Refreshing overview failed: {}", e);
            self.status_message = Some(format!("Could not read the database: {}", e));
        }
    }

    fn try_refresh(&mut self) -> rusqlite::Result<()> {
        let conn = self.repo.conn();
        self.today = db::get_current_date(conn)?;

        self.due_counts = self
            .all_decks
            .decks
            .iter()
            .map(|deck| db::count_due_cards(&deck.name, self.config.learner_id, self.today, conn))
            .collect::<rusqlite::Result<_>>()?;

        let today_start = self
            .today
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(self.today);
        let history = db::review_history(self.config.learner_id, conn)?;
        self.stats = ReviewStats::from_entries(&history, today_start);
        Ok(())
    }

    /// Renders the main screen with deck management interface
    fn render_main_screen(&mut self, ctx: &egui::Context) {
        // We store actions to execute after UI rendering to avoid borrowing conflicts
        let mut action_next_day = false;
        let mut action_create_deck = false;
        let mut action_add_card = false;
        let mut action_review: Option<(Option<usize>, bool)> = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format_date(self.today));
                if ui.button("Next Day").clicked() {
                    action_next_day = true;
                }
            });
            ui.label(format!(
                "Reviews: {} total, {} today, {:.0}% remembered",
                self.stats.total_reviews,
                self.stats.reviews_today,
                self.stats.success_rate() * 100.0
            ));
            if let Some(message) = &self.status_message {
                ui.colored_label(egui::Color32::RED, message);
            }
            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("Export Deck").clicked() {
                    self.show_export_dialog = true;
                }
                if ui.button("Import Deck").clicked() {
                    self.handle_import();
                }
            });

            ui.separator();

            ui.heading("Create New Deck");
            ui.horizontal(|ui| {
                ui.label("Deck name:");
                ui.text_edit_singleline(&mut self.new_deck_name);
                if ui.button("Create Deck").clicked() {
                    action_create_deck = true;
                }
            });

            ui.separator();

            ui.heading(format!("Decks ({})", self.all_decks.decks.len()));
            ui.horizontal(|ui| {
                ui.label("Review:");
                ui.radio_value(&mut self.session_mode, SessionMode::Due, "Due cards");
                ui.radio_value(&mut self.session_mode, SessionMode::All, "All cards");
                if ui.button("Review all decks").clicked() {
                    action_review = Some((None, false));
                }
            });

            egui::ScrollArea::vertical()
                .id_salt("decks_list")
                .max_height(150.0)
                .show(ui, |ui| {
                    for (i, deck) in self.all_decks.decks.iter().enumerate() {
                        let is_selected = self.selected_deck_index == Some(i);
                        let due = self.due_counts.get(i).copied().unwrap_or(0);

                        ui.horizontal(|ui| {
                            if ui
                                .selectable_label(
                                    is_selected,
                                    format!(
                                        "{}. {} ({} cards, {} due)",
                                        i + 1,
                                        deck.name,
                                        deck.flashcards.len(),
                                        due
                                    ),
                                )
                                .clicked()
                            {
                                self.selected_deck_index = Some(i);
                            }

                            if ui.button("Learn").clicked() {
                                action_review = Some((Some(i), false));
                            }
                            if ui.button("Browse").clicked() {
                                action_review = Some((Some(i), true));
                            }
                        });
                    }
                });

            ui.separator();

            // Flashcard management for selected deck
            if let Some(deck) = self
                .selected_deck_index
                .and_then(|i| self.all_decks.decks.get(i))
            {
                ui.heading(format!("Selected Deck: {}", deck.name));

                ui.horizontal(|ui| {
                    ui.label("Portuguese:");
                    ui.text_edit_singleline(&mut self.current_term);
                });

                ui.horizontal(|ui| {
                    ui.label("English:");
                    ui.text_edit_singleline(&mut self.current_definition);
                });
                if ui.button("Add Flashcard").clicked() {
                    action_add_card = true;
                }

                ui.separator();

                ui.heading(format!("Flashcards ({})", deck.flashcards.len()));

                egui::ScrollArea::vertical()
                    .id_salt("flashcards_list")
                    .max_height(200.0)
                    .show(ui, |ui| {
                        for (i, flashcard) in deck.flashcards.iter().enumerate() {
                            ui.group(|ui| {
                                ui.label(format!("{}. {}", i + 1, flashcard.term));
                                ui.label(format!("   {}", flashcard.definition));
                            });
                        }
                    });
            } else {
                ui.label("Select a deck to add flashcards");
            }
        });

        // Execute deferred actions
        if action_next_day {
            if let Err(e) = db::advance_day(self.repo.conn()) {
                self.status_message = Some(format!("Could not advance the date: {}", e));
            }
            self.refresh();
        }
        if action_create_deck {
            self.create_deck();
        }
        if action_add_card {
            self.add_flashcard();
        }
        if let Some((deck_index, browsing)) = action_review {
            self.start_review_session(deck_index, browsing);
        }
    }

    fn create_deck(&mut self) {
        let name = self.new_deck_name.trim().to_string();
        if name.is_empty() || self.all_decks.contains(&name) {
            return;
        }

        match db::new_deck(&name, self.config.learner_id, self.repo.conn()) {
            Ok(()) => {
                self.all_decks.decks.push(palavras::Deck {
                    name,
                    flashcards: Vec::new(),
                });
                self.new_deck_name.clear();
                self.status_message = None;
                self.refresh();
            }
            Err(e) => self.status_message = Some(format!("Could not create deck: {}", e)),
        }
    }

    fn add_flashcard(&mut self) {
        let flashcard = Flashcard::new(self.current_term.trim(), self.current_definition.trim());
        if !flashcard.is_valid() {
            return;
        }
        let Some(index) = self.selected_deck_index else {
            return;
        };
        let Some(deck) = self.all_decks.decks.get_mut(index) else {
            return;
        };

        match db::add_flashcard(
            &deck.name,
            self.config.learner_id,
            &flashcard.term,
            &flashcard.definition,
            self.repo.conn(),
        ) {
            Ok(_) => {
                if !deck.flashcards.iter().any(|f| f.term == flashcard.term) {
                    deck.flashcards.push(flashcard);
                }
                self.current_term.clear();
                self.current_definition.clear();
                self.status_message = None;
                self.refresh();
            }
            Err(e) => self.status_message = Some(format!("Could not add flashcard: {}", e)),
        }
    }

    /// Starts a review (or browsing) session over one deck or all decks
    fn start_review_session(&mut self, deck_index: Option<usize>, browsing: bool) {
        let mut request = SessionRequest::new(self.config.learner_id, self.session_mode)
            .with_allowed_grades(self.config.allowed_grades.clone());
        if let Some(deck) = deck_index.and_then(|i| self.all_decks.decks.get(i)) {
            request = request.in_deck(deck.name.clone());
        }
        if browsing {
            request = request.browsing();
        }

        let mut session = ReviewSession::new(request);
        match session.start(&self.repo, self.today) {
            Ok(_) => {
                self.session = Some(session);
                self.show_back = false;
                self.status_message = None;
                self.current_screen = AppScreen::Review;
            }
            Err(e) => self.status_message = Some(format!("Could not start the session: {}", e)),
        }
    }

    /// Renders the review screen for the current session
    fn render_review_screen(&mut self, ctx: &egui::Context) {
        let mut action: Option<ReviewAction> = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = &self.session else {
                return;
            };

            let title = session
                .request()
                .deck_name
                .clone()
                .unwrap_or_else(|| "All decks".to_string());
            ui.heading(format!("Reviewing: {}", title));
            ui.label(session.phase_message());
            ui.add_space(20.0);

            match session.phase() {
                SessionPhase::Empty => {
                    ui.heading("No cards to review");
                    ui.label("Nothing is due right now. Come back tomorrow or review all cards.");
                }
                SessionPhase::Complete => {
                    ui.heading("Parabéns!");
                    ui.label(format!(
                        "You remembered {} of {} cards.",
                        session.correct_count(),
                        session.total_count()
                    ));
                }
                _ => {
                    if let Some(card) = session.current_card() {
                        ui.group(|ui| {
                            ui.set_min_height(200.0);
                            ui.vertical_centered(|ui| {
                                ui.add_space(20.0);
                                ui.heading(&card.flashcard.term);
                                ui.add_space(20.0);

                                if self.show_back {
                                    ui.label(&card.flashcard.definition);
                                } else {
                                    ui.label("(Click 'Show Answer' to reveal)");
                                }

                                ui.add_space(20.0);
                            });
                        });

                        ui.add_space(20.0);

                        if ui
                            .button(if self.show_back { "Hide Answer" } else { "Show Answer" })
                            .clicked()
                        {
                            action = Some(ReviewAction::Flip);
                        }

                        if session.request().browsing {
                            ui.horizontal(|ui| {
                                if ui.button("Previous").clicked() {
                                    action = Some(ReviewAction::Previous);
                                }
                                if ui.button("Next").clicked() {
                                    action = Some(ReviewAction::Next);
                                }
                            });
                        } else if self.show_back {
                            ui.label("How well did you remember it?");
                            ui.horizontal(|ui| {
                                let previews = preview_intervals(
                                    &card.schedule,
                                    &session.request().allowed_grades,
                                    self.today,
                                );
                                for (quality, interval) in previews {
                                    let label = Grade::from_quality(quality)
                                        .map(Grade::label)
                                        .unwrap_or_else(|| quality_label(quality));
                                    let text = format!("{} ({})", label, format_interval(interval));
                                    if ui.button(text).clicked() {
                                        action = Some(ReviewAction::Grade(quality));
                                    }
                                }
                            });
                        }
                    }
                }
            }

            if let Some(message) = &self.status_message {
                ui.add_space(10.0);
                ui.colored_label(egui::Color32::RED, message);
            }

            ui.add_space(20.0);
            if ui.button("Back to Main Screen").clicked() {
                action = Some(ReviewAction::Back);
            }
        });

        if let Some(action) = action {
            self.apply_review_action(action);
        }
    }

    fn apply_review_action(&mut self, action: ReviewAction) {
        if let ReviewAction::Back = action {
            // Abandoning keeps every grade already saved
            self.session = None;
            self.status_message = None;
            self.current_screen = AppScreen::Main;
            self.refresh();
            return;
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };

        let result = match action {
            ReviewAction::Flip => {
                self.show_back = !self.show_back;
                Ok(())
            }
            ReviewAction::Grade(quality) => session
                .grade_current_card(&mut self.repo, quality, self.today)
                .map(|_| self.show_back = false),
            ReviewAction::Next => session.next_card().map(|_| self.show_back = false),
            ReviewAction::Previous => session.previous_card().map(|_| self.show_back = false),
            ReviewAction::Back => Ok(()),
        };

        self.status_message = match result {
            Ok(()) => None,
            Err(ReviewError::Persistence(e)) => {
                Some(format!("Your answer was not saved ({}). Please try again.", e))
            }
            Err(e) => Some(e.to_string()),
        };
    }

    /// Handles deck export to JSON file
    fn handle_export(&mut self, deck_index: usize) {
        if let Some(deck) = self.all_decks.decks.get(deck_index) {
            if let Some(path) = rfd::FileDialog::new()
                .set_file_name(format!("{}.json", deck.name))
                .add_filter("JSON files", &["json"])
                .save_file()
            {
                self.import_result_message = match export_json_to_path(deck, &path) {
                    Ok(()) => format!("Deck '{}' exported successfully!", deck.name),
                    Err(e) => format!("Export failed: {}", e),
                };
                self.show_import_result_dialog = true;
            }
        }
        self.show_export_dialog = false;
    }

    /// Handles deck import from JSON file
    fn handle_import(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .pick_file()
        else {
            return;
        };

        let imported = import_json(&path).and_then(|deck| {
            save_imported_deck(&deck, self.config.learner_id, &self.all_decks, self.repo.conn())?;
            Ok(deck)
        });

        self.import_result_message = match imported {
            Ok(deck) => {
                let message = format!(
                    "Deck '{}' imported successfully with {} cards!",
                    deck.name,
                    deck.flashcards.len()
                );
                self.all_decks.decks.push(deck);
                self.refresh();
                message
            }
            Err(e) => format!(
                "Import failed: {}\n\nPlease check if the file has correct structure:\n{{\n  \"name\": \"Deck Name\",\n  \"flashcards\": [...]\n}}",
                e
            ),
        };
        self.show_import_result_dialog = true;
    }
}
