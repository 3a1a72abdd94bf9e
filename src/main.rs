mod app;
use palavras::*;

use app::MyApp;
use config::AppConfig;
use database::db::load_all_decks;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let repo = SqliteRepository::open(&config.database_path)?;

    if sample::seed_if_empty(config.learner_id, repo.conn())? {
        log::info!("Sample deck '{}' created", sample::SAMPLE_DECK);
    }

    let deck_set = load_all_decks(config.learner_id, repo.conn())?;

    log::info!("Loaded {} decks from database", deck_set.decks.len());
    for deck in &deck_set.decks {
        log::info!("  - {} ({} cards)", deck.name, deck.flashcards.len());
    }
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([500.0, 700.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Palavras",
        options,
        Box::new(|_cc| Ok(Box::new(MyApp::new(config, deck_set, repo)))),
    )?;
    Ok(())
}
