use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::{prepare_cart, print_receipt, storefront_client};

#[derive(Debug, Args)]
pub(crate) struct PriceArgs {
    /// Store configuration file
    #[arg(long, env = "QUIZ_CART_CONFIG")]
    config: PathBuf,

    /// Scenario to replay
    #[arg(long)]
    scenario: PathBuf,

    /// Quiz results JSON, used to pick gender-specific gifts
    #[arg(long)]
    quiz_results: Option<PathBuf>,

    /// Fetch gift products from the configured storefront
    #[arg(long)]
    resolve_gifts: bool,
}

pub(crate) async fn run(args: &PriceArgs) -> Result<(), String> {
    let mut cart = prepare_cart(&args.config, &args.scenario, args.quiz_results.as_deref())?;

    if args.resolve_gifts {
        let client = storefront_client(&cart.config)?;
        let resolved = cart.engine.resolve_gift_products(&client).await;

        info!(resolved, "resolved gift products");
    }

    print_receipt(&cart.engine)
}
