//! Command implementations.
//!
//! Each command takes the initialized [`AppState`](vitrine_storefront::AppState)
//! and writes its human-readable result to `out`.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;

use std::io::Write;

use thiserror::Error;

use vitrine_core::{CartEntry, Product, ProductId};
use vitrine_storefront::AppError;
use vitrine_storefront::views::Header;

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The storefront operation failed.
    #[error("{}", .0.user_message())]
    App(#[from] AppError),

    /// Writing the output failed.
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CommandResult = Result<(), CommandError>;

fn write_product(out: &mut impl Write, product: &Product) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>6}  {:<32}  {:>12}",
        product.id.as_str(),
        product.title,
        product.price.display()
    )
}

fn write_entry(out: &mut impl Write, entry: &CartEntry) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>6}  {:<32}  x{:<4} {:>12}",
        entry.id().as_str(),
        entry.product.title,
        entry.quantity,
        vitrine_core::format_amount(entry.line_total())
    )
}

fn write_header(out: &mut impl Write, header: &Header) -> std::io::Result<()> {
    if let Some(greeting) = header.greeting() {
        writeln!(out, "{greeting}")?;
    }
    writeln!(out, "Cart: {} item(s), {}", header.cart_count, header.cart_total)
}

fn parse_id(raw: &str) -> ProductId {
    ProductId::from(raw)
}
