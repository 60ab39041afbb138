/*
[INPUT]:  Users, session snapshots, notices from the auth session
[OUTPUT]: Styled terminal output
[POS]:    CLI presentation layer
[UPDATE]: When displayed fields change
*/

use console::style;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use marketplace_auth::{
    AuthenticatedUser, Notice, NoticeLevel, Order, Product, SessionSnapshot, UserStats,
};

/// Print notices as they arrive, toast style.
///
/// The task drains everything already queued once the notifier is dropped,
/// then resolves to the number of notices printed.
pub fn spawn_notice_printer(mut notices: broadcast::Receiver<Notice>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut printed = 0;
        loop {
            match notices.recv().await {
                Ok(notice) => {
                    print_notice(&notice);
                    printed += 1;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        printed
    })
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Success => eprintln!("{} {}", style("✔").green(), notice.message),
        NoticeLevel::Info => eprintln!("{} {}", style("ℹ").cyan(), notice.message),
        NoticeLevel::Error => eprintln!("{} {}", style("✘").red(), style(&notice.message).red()),
    }
}

pub fn print_user(user: &AuthenticatedUser) {
    println!("{}", style(&user.name).bold());
    println!("  {:<8} {}", style("email").dim(), user.email);
    println!("  {:<8} {}", style("wallet").dim(), user.wallet);
    println!("  {:<8} {}", style("country").dim(), user.country);
    println!("  {:<8} {}", style("role").dim(), user.role);
}

pub fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("{}", style("No listings").dim());
        return;
    }
    for product in products {
        let availability = if product.is_available {
            style("available").green()
        } else {
            style("sold out").red()
        };
        println!(
            "{:<12} {:<28} {:>10} {:<12} {}",
            style(&product.id).dim(),
            product.name,
            product.price,
            product.category,
            availability
        );
    }
}

pub fn print_product(product: &Product) {
    println!("{}", style(&product.name).bold());
    println!("  {:<9} {}", style("id").dim(), product.id);
    println!("  {:<9} {}", style("price").dim(), product.price);
    println!("  {:<9} {}", style("category").dim(), product.category);
    if let Some(quantity) = product.quantity {
        println!("  {:<9} {}", style("quantity").dim(), quantity);
    }
    if let Some(owner) = &product.user {
        println!("  {:<9} {} ({})", style("seller").dim(), owner.name, owner.wallet);
    }
    if !product.description.is_empty() {
        println!("  {}", product.description);
    }
}

pub fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("{}", style("No orders").dim());
        return;
    }
    for order in orders {
        println!(
            "{:<12} {:<12} {:<28} {:>10} {}",
            style(&order.id).dim(),
            order.status,
            order.product.name,
            order.product.price,
            order.created_at.format("%Y-%m-%d")
        );
    }
}

pub fn print_order(order: &Order) {
    println!("{} {}", style("Order").bold(), order.id);
    println!("  {:<9} {}", style("status").dim(), order.status);
    println!("  {:<9} {} ({})", style("product").dim(), order.product.name, order.product.price);
    if let Some(code) = &order.delivery_code {
        println!("  {:<9} {}", style("delivery").dim(), code);
    }
    if let Some(buyer) = &order.buyer {
        println!("  {:<9} {} <{}>", style("buyer").dim(), buyer.name, buyer.email);
    }
    if let Some(tx) = &order.transaction {
        println!("  {:<9} {} {} ({})", style("payment").dim(), tx.tx_hash, tx.amount, tx.status);
    }
}

pub fn print_stats(stats: &UserStats) {
    println!("{}", style("Activity").bold());
    println!("  {:<17} {}", style("active listings").dim(), stats.active_listings);
    println!("  {:<17} {}", style("orders").dim(), stats.total_orders);
    println!("  {:<17} {}", style("completed").dim(), stats.completed_orders);
    println!("  {:<17} {:.4}", style("total amount").dim(), stats.total_amount);
}

pub fn print_snapshot(snapshot: &SessionSnapshot) {
    match &snapshot.wallet {
        Some(wallet) => {
            println!("{} {}", style("wallet").dim(), wallet.address);
            if let Some(chain_id) = wallet.chain_id {
                println!("{} {chain_id}", style("chain").dim());
            }
            println!("{} {}", style("balance").dim(), wallet.balance);
        }
        None => println!("{}", style("No wallet connected").yellow()),
    }
    match &snapshot.user {
        Some(user) => print_user(user),
        None => println!("{}", style("Not signed in").yellow()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketplace_auth::Notifier;

    #[tokio::test]
    async fn test_printer_drains_queued_notices_before_exit() {
        let notifier = Notifier::new();
        let printer = spawn_notice_printer(notifier.subscribe());

        notifier.success("Login successful!");
        notifier.info("Wallet account changed");
        notifier.error("Session expired");
        drop(notifier);

        assert_eq!(printer.await.unwrap(), 3);
    }
}
