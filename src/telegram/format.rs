//! Telegram message templates.
//!
//! Every surface that talks to employees (relay consumer, push endpoint,
//! bot `/status`) renders through these functions. Messages use the Bot API
//! HTML parse mode, so every interpolated value goes through [`escape_html`].

use std::fmt::Write;

use crate::domain::order::{display_price, OrderStatus};
use crate::models::Order;

pub fn status_emoji(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "⏳",
        OrderStatus::Preparing => "👨‍🍳",
        OrderStatus::Delivering => "🚚",
        OrderStatus::Delivered => "✅",
    }
}

/// Human-readable progress sentence for a status
pub fn status_progress(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Your order has been received and is waiting to be prepared.",
        OrderStatus::Preparing => "Your order is being prepared.",
        OrderStatus::Delivering => "Your order is on its way to you!",
        OrderStatus::Delivered => "Your order has been delivered. Enjoy!",
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Status update for the employee who placed `order`
pub fn order_status_message(order: &Order, employee_name: &str, company_name: Option<&str>) -> String {
    let mut text = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(text, "{} <b>Order Update</b>", status_emoji(order.status));
    let _ = writeln!(text);
    let _ = writeln!(text, "Hi {},", escape_html(employee_name));
    let _ = writeln!(text, "{}", status_progress(order.status));
    let _ = writeln!(text);
    let _ = writeln!(text, "<b>Order:</b> #{}", escape_html(order.short_id()));
    if let Some(company) = company_name {
        let _ = writeln!(text, "<b>Company:</b> {}", escape_html(company));
    }
    if let Some(floor) = order.floor.as_deref().filter(|f| !f.is_empty()) {
        let _ = writeln!(text, "<b>Floor:</b> {}", escape_html(floor));
    }
    let _ = writeln!(text, "<b>Status:</b> {}", order.status.as_str().to_uppercase());

    if !order.items.is_empty() {
        let _ = writeln!(text);
        let _ = writeln!(text, "<b>Items:</b>");
        for item in order.items.iter() {
            let _ = writeln!(text, "• {}x {}", item.quantity, escape_html(&item.name));
        }
    }

    let _ = write!(text, "\n<b>Total:</b> {} ETB", display_price(order.total_price));
    text
}

pub fn welcome_message(first_name: Option<&str>) -> String {
    let name = first_name.map(escape_html).unwrap_or_else(|| "there".to_string());
    format!(
        "👋 Hi {name}!\n\n\
         I send you updates when your office orders move along.\n\n\
         To link your account, reply with the phone number registered with your company \
         (for example <code>0912345678</code> or <code>+251912345678</code>)."
    )
}

pub fn help_message() -> String {
    "ℹ️ <b>Commands</b>\n\n\
     /start - link your account\n\
     /status - latest order status\n\
     /help - this message\n\n\
     Send your phone number at any time to link this chat to your employee account."
        .to_string()
}

pub fn registered_message(employee_name: &str) -> String {
    format!(
        "✅ Thanks {}! This chat is now linked. You will get a message whenever your order status changes.",
        escape_html(employee_name)
    )
}

pub fn phone_not_found_message() -> String {
    "❌ No employee is registered with that phone number. Please check the number or ask your office admin."
        .to_string()
}

pub fn invalid_phone_message() -> String {
    "⚠️ That does not look like a phone number. Send it as <code>09XXXXXXXX</code> or <code>+2519XXXXXXXX</code>, \
     or use /help."
        .to_string()
}

pub fn not_linked_message() -> String {
    "🔗 This chat is not linked yet. Send your phone number to link it.".to_string()
}

pub fn no_orders_message(employee_name: &str) -> String {
    format!("📭 Hi {}, you have no orders yet.", escape_html(employee_name))
}

pub fn unavailable_message() -> String {
    "⚠️ Something went wrong on our side. Please try again in a moment.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderItem, OrderItems};
    use chrono::Utc;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: "abc12345-0000".to_string(),
            items: OrderItems(vec![
                OrderItem { item_id: "m1".to_string(), name: "Macchiato".to_string(), quantity: 2, price: 50.0 },
                OrderItem { item_id: "m2".to_string(), name: "Tea & Biscuits".to_string(), quantity: 1, price: 50.0 },
            ]),
            total_price: 150.0,
            floor: Some("3".to_string()),
            status,
            created_at: Utc::now(),
            updated_at: None,
            company_id: Some("c1".to_string()),
            employee_id: Some("e1".to_string()),
            employee_name: Some("Hana".to_string()),
        }
    }

    #[test]
    fn test_every_status_has_emoji_and_sentence() {
        for status in OrderStatus::PIPELINE {
            assert!(!status_emoji(status).is_empty());
            assert!(status_progress(status).ends_with(['.', '!']));
        }
    }

    #[test]
    fn test_status_message_layout() {
        let text = order_status_message(&order(OrderStatus::Delivering), "Hana", Some("Acme <HQ>"));

        assert!(text.starts_with("🚚 <b>Order Update</b>"));
        assert!(text.contains("Your order is on its way to you!"));
        assert!(text.contains("<b>Order:</b> #abc12345\n"));
        assert!(text.contains("<b>Company:</b> Acme &lt;HQ&gt;"));
        assert!(text.contains("<b>Floor:</b> 3"));
        assert!(text.contains("<b>Status:</b> DELIVERING"));
        assert!(text.contains("• 2x Macchiato"));
        assert!(text.contains("• 1x Tea &amp; Biscuits"));
        assert!(text.ends_with("<b>Total:</b> 150 ETB"));
    }

    #[test]
    fn test_company_line_omitted_without_name() {
        let text = order_status_message(&order(OrderStatus::Delivered), "Hana", None);
        assert!(!text.contains("Company"));
        assert!(text.contains("delivered. Enjoy!"));
    }

    #[test]
    fn test_welcome_escapes_name() {
        assert!(welcome_message(Some("<script>")).contains("&lt;script&gt;"));
        assert!(welcome_message(None).contains("Hi there!"));
    }
}
