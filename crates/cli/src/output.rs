//! Terminal output.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use saverush_storefront::backend::PlacedOrder;
use saverush_storefront::error::AppError;
use saverush_storefront::models::Session;
use saverush_storefront::services::cart::{
    CartManager, MigrationReport, Notification, NotificationLevel, Notifier,
};

/// Prints cart notifications as they happen.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => println!("✓ {}", notification.message),
            NotificationLevel::Error => eprintln!("✗ {}", notification.message),
        }
    }
}

pub fn cart(cart: &CartManager) {
    if cart.items().is_empty() {
        println!("Your cart is empty.");
    } else {
        for item in cart.items() {
            println!(
                "{:>3} × {:<32} {:>10}  ({})",
                item.quantity,
                item.name,
                item.line_total(),
                item.id
            );
        }
        println!("{} item(s)", cart.total_items());
    }

    if let Some(coupon) = cart.applied_coupon() {
        println!("Coupon {} (-{})", coupon.code, coupon.discount);
    }
    match (cart.original_price(), cart.discounted_price()) {
        (Some(original), Some(current)) if original != current => {
            println!("Total: {current} (was {original})");
        }
        _ => println!("Total: {}", cart.total_price()),
    }
}

pub fn session(cart: &CartManager) {
    match cart.session() {
        Some(Session::Authenticated(user)) => {
            let phone = user
                .phone
                .as_ref()
                .map_or_else(|| "no phone".to_string(), |p| p.masked());
            println!("Signed in as {} ({phone})", user.id);
            if let Some(expires_at) = user.expires_at {
                println!("Session expires {expires_at}");
            }
        }
        Some(Session::Guest(guest)) => {
            println!("Guest session {} (expires {})", guest.token, guest.expires_at);
        }
        None => println!("No session"),
    }
}

pub fn migration(report: &MigrationReport) {
    if report.is_empty() {
        return;
    }
    println!("Moved {} item(s) from your guest cart.", report.migrated.len());
    for (id, reason) in &report.failed {
        eprintln!("  could not move {id}: {reason}");
    }
}

pub fn order(order: &PlacedOrder) {
    println!(
        "Order {} is {} (total {})",
        order.id, order.status, order.total_amount
    );
}

pub fn warning(message: &str) {
    eprintln!("! {message}");
}

pub fn failure(error: &AppError) {
    eprintln!("error: {}", error.user_message());
}
