use std::time::Duration;

use clap::Args;
use quiz_cart::{
    backend::{CommerceBackend, StorefrontClient},
    discounts::{apply_plan, discount_percent},
    money::{CurrencyContext, MoneyFormatter},
    products::Product,
    quiz::{UpsellAction, upsell_action},
};
use rust_decimal::Decimal;

#[derive(Debug, Args)]
pub(crate) struct ProductArgs {
    /// Product handle
    handle: String,

    /// Storefront origin
    #[arg(long, env = "QUIZ_CART_STOREFRONT")]
    storefront: String,

    /// Currency the storefront prices are in
    #[arg(long, default_value = "USD")]
    currency: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Treat the shopper as having completed the quiz
    #[arg(long)]
    quiz_completed: bool,

    /// Quiz page shoppers are sent to
    #[arg(long)]
    quiz_url: Option<String>,
}

pub(crate) async fn run(args: &ProductArgs) -> Result<(), String> {
    let client = StorefrontClient::new(&args.storefront, Duration::from_secs(args.timeout_secs))
        .map_err(|error| format!("failed to create storefront client: {error}"))?;

    let product = client
        .fetch_product(&args.handle)
        .await
        .ok_or_else(|| format!("product {} not found", args.handle))?;

    let formatter = CurrencyContext::new(&args.currency, &args.currency, Decimal::ONE)
        .map(MoneyFormatter::new)
        .map_err(|error| error.to_string())?;

    print_product(&product, &formatter, args);

    Ok(())
}

#[expect(clippy::print_stdout, reason = "command output")]
fn print_product(product: &Product, formatter: &MoneyFormatter, args: &ProductArgs) {
    let price = |minor: Decimal| formatter.format_active(minor);

    println!("title: {}", product.title());
    println!("handle: {}", product.handle());

    if !product.tags().is_empty() {
        println!("tags: {}", product.tags().join(", "));
    }

    for variant in product.variants() {
        let compare_at = variant
            .effective_compare_at_price()
            .map_or_else(String::new, |compare_at| {
                format!(" (was {})", price(Decimal::from(compare_at)))
            });

        println!(
            "variant {}: {} {}{compare_at}{}",
            variant.id,
            product.display_name(variant),
            price(Decimal::from(variant.price)),
            if variant.available { "" } else { " [sold out]" },
        );

        for plan in product
            .selling_plan_groups()
            .iter()
            .flat_map(|group| group.selling_plans.iter())
        {
            println!(
                "  plan {}: {} {} (-{}%)",
                plan.id,
                plan.name,
                price(apply_plan(Decimal::from(variant.price), plan)),
                discount_percent(plan),
            );
        }
    }

    match upsell_action(product, args.quiz_completed, args.quiz_url.as_deref()) {
        UpsellAction::AddToCart => println!("upsell: add to cart"),
        UpsellAction::RedirectToQuiz(url) => println!("upsell: take the quiz at {url}"),
    }
}
