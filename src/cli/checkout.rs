use std::{path::PathBuf, sync::Arc};

use clap::Args;
use quiz_cart::{
    backend::RemoteLine,
    checkout::{CheckoutPlan, CheckoutSubmitter, OrderNote},
};

use super::{prepare_cart, print_receipt, storefront_client};

#[derive(Debug, Args)]
pub(crate) struct CheckoutArgs {
    /// Store configuration file
    #[arg(long, env = "QUIZ_CART_CONFIG")]
    config: PathBuf,

    /// Scenario to replay
    #[arg(long)]
    scenario: PathBuf,

    /// Quiz results JSON attached to the order note
    #[arg(long)]
    quiz_results: Option<PathBuf>,

    /// Print what would be submitted without contacting the storefront
    #[arg(long)]
    dry_run: bool,
}

pub(crate) async fn run(args: &CheckoutArgs) -> Result<(), String> {
    let cart = prepare_cart(&args.config, &args.scenario, args.quiz_results.as_deref())?;

    print_receipt(&cart.engine)?;

    let plan = CheckoutPlan::for_cart(&cart.engine);

    if args.dry_run {
        let note = OrderNote::build(plan.bogo_titles(), cart.quiz.as_ref())
            .truncated(cart.config.checkout.note_limit);

        print_plan(plan.lines(), &note);

        return Ok(());
    }

    let client = storefront_client(&cart.config)?;
    let base_url = client.base_url().to_string();
    let mut submitter = CheckoutSubmitter::new(Arc::new(client), cart.config.checkout.clone());

    let redirect = submitter
        .submit(&plan, cart.quiz.as_ref())
        .await
        .map_err(|error| format!("checkout failed: {error}"))?;

    print_redirect(&format!("{base_url}{}", redirect.path));

    Ok(())
}

#[expect(clippy::print_stdout, reason = "command output")]
fn print_plan(lines: &[RemoteLine], note: &OrderNote) {
    for line in lines {
        match line.selling_plan {
            Some(plan) => println!("add {} x{} (plan {plan})", line.id, line.quantity),
            None => println!("add {} x{}", line.id, line.quantity),
        }
    }

    println!("\n{}", note.as_str());
}

#[expect(clippy::print_stdout, reason = "command output")]
fn print_redirect(url: &str) {
    println!("checkout: {url}");
}
