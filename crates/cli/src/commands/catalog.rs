//! `vitrine products`

use std::io::Write;

use vitrine_storefront::AppState;

use super::{CommandResult, write_product};

/// List the catalog, or the load error.
pub fn list(state: &AppState, out: &mut impl Write) -> CommandResult {
    let products = state.products();

    if let Some(error) = products.error() {
        writeln!(out, "{error}")?;
        return Ok(());
    }
    if products.all().is_empty() {
        writeln!(out, "No products yet.")?;
        return Ok(());
    }

    for product in products.all() {
        write_product(out, product)?;
    }
    Ok(())
}
