use std::{fs, io, path::Path};

use clap::{Parser, Subcommand};
use quiz_cart::{
    backend::StorefrontClient,
    cart::CartEngine,
    config::StoreConfig,
    money::MoneyFormatter,
    observability::LoggingConfig,
    quiz::QuizResults,
    receipt::Receipt,
    render::TracingSink,
    scenario::Scenario,
};

mod checkout;
mod price;
mod product;

#[derive(Debug, Parser)]
#[command(name = "quiz-cart", about = "Quiz cart pricing and checkout", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a scenario and print the priced cart
    Price(price::PriceArgs),

    /// Fetch a product from a storefront
    Product(product::ProductArgs),

    /// Replay a scenario and submit the cart to the storefront
    Checkout(checkout::CheckoutArgs),
}

impl Cli {
    pub(crate) fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Price(args) => price::run(&args).await,
            Commands::Product(args) => product::run(&args).await,
            Commands::Checkout(args) => checkout::run(&args).await,
        }
    }
}

fn load_quiz_results(path: Option<&Path>) -> Result<Option<QuizResults>, String> {
    let Some(path) = path else {
        return Ok(None);
    };

    let json = fs::read_to_string(path)
        .map_err(|error| format!("failed to read quiz results {}: {error}", path.display()))?;

    QuizResults::from_json(&json)
        .map(Some)
        .map_err(|error| format!("failed to parse quiz results: {error}"))
}

/// A cart built from a store config and replayed scenario.
struct PreparedCart {
    config: StoreConfig,
    engine: CartEngine,
    quiz: Option<QuizResults>,
}

fn prepare_cart(
    config_path: &Path,
    scenario_path: &Path,
    quiz_path: Option<&Path>,
) -> Result<PreparedCart, String> {
    let config = StoreConfig::load(config_path)
        .map_err(|error| format!("failed to load config {}: {error}", config_path.display()))?;

    let scenario = Scenario::load(scenario_path)
        .map_err(|error| format!("failed to load scenario {}: {error}", scenario_path.display()))?;

    let quiz = load_quiz_results(quiz_path)?;
    let audience = quiz.as_ref().map(QuizResults::audience).unwrap_or_default();

    let mut engine = config
        .engine(audience)
        .map_err(|error| format!("invalid config: {error}"))?;

    engine.subscribe(TracingSink);

    scenario
        .replay(&mut engine)
        .map_err(|error| format!("failed to replay scenario: {error}"))?;

    Ok(PreparedCart {
        config,
        engine,
        quiz,
    })
}

fn storefront_client(config: &StoreConfig) -> Result<StorefrontClient, String> {
    let settings = config
        .storefront()
        .map_err(|error| error.to_string())?;

    StorefrontClient::new(&settings.base_url, settings.timeout())
        .map_err(|error| format!("failed to create storefront client: {error}"))
}

fn print_receipt(engine: &CartEngine) -> Result<(), String> {
    let view = engine.view();
    let formatter = MoneyFormatter::new(engine.currency().clone());
    let mut receipt = Receipt::new(&view, &formatter);

    if let Some(progress) = &view.gift_progress {
        receipt = receipt.with_progress_message(
            engine.gift_tiers().progress_message(progress, &formatter),
        );
    }

    receipt
        .write_to(io::stdout().lock())
        .map_err(|error| error.to_string())
}
