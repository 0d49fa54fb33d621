//! `vitrine cart ...`

use std::io::Write;

use vitrine_storefront::views::Header;
use vitrine_storefront::{AppError, AppState};

use super::{CommandResult, parse_id, write_entry, write_header};

/// Print the cart entries and the header badge.
pub fn show(state: &AppState, out: &mut impl Write) -> CommandResult {
    if state.cart().is_empty() {
        writeln!(out, "Your cart is empty.")?;
    }
    for entry in state.cart().entries() {
        write_entry(out, entry)?;
    }
    write_header(out, &Header::of(state))?;
    Ok(())
}

/// Add one unit of a catalog product.
pub async fn add(state: &mut AppState, id: &str, out: &mut impl Write) -> CommandResult {
    let id = parse_id(id);
    let product = state
        .products()
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    let title = product.title.clone();
    state.add_to_cart(product).await;
    writeln!(out, "Added {title} to the cart.")?;
    show(state, out)
}

pub async fn remove(state: &mut AppState, id: &str, out: &mut impl Write) -> CommandResult {
    let id = parse_id(id);
    if state.cart().get(&id).is_none() {
        writeln!(out, "Product {id} is not in the cart.")?;
        return Ok(());
    }
    state.remove_from_cart(&id).await;
    show(state, out)
}

/// Set a quantity; values below 1 are refused here rather than stored.
pub async fn set_quantity(
    state: &mut AppState,
    id: &str,
    quantity: i32,
    out: &mut impl Write,
) -> CommandResult {
    if quantity < 1 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1; use `cart remove` to drop a product".to_string(),
        )
        .into());
    }

    let id = parse_id(id);
    if state.cart().get(&id).is_none() {
        return Err(AppError::NotFound(format!("Product {id} in the cart")).into());
    }
    state.update_qty_cart(&id, quantity).await;
    show(state, out)
}

pub async fn clear(state: &mut AppState, out: &mut impl Write) -> CommandResult {
    state.clear_cart().await;
    writeln!(out, "Cart cleared.")?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use vitrine_storefront::config::SupabaseConfig;
    use vitrine_storefront::storage::MemoryStorage;
    use vitrine_storefront::supabase::SupabaseClient;

    use super::*;
    use crate::commands::CommandError;

    fn offline_state() -> AppState {
        let config = SupabaseConfig::new("http://127.0.0.1:9", "anon").unwrap();
        let client = SupabaseClient::new(&config, Duration::from_millis(200)).unwrap();
        AppState::new(client, MemoryStorage::new())
    }

    #[tokio::test]
    async fn test_quantity_below_one_is_refused() {
        let mut state = offline_state();
        let mut out = Vec::new();

        let err = set_quantity(&mut state, "7", 0, &mut out).await.unwrap_err();
        assert!(matches!(err, CommandError::App(AppError::BadRequest(_))));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let mut state = offline_state();
        let mut out = Vec::new();

        let err = add(&mut state, "missing", &mut out).await.unwrap_err();
        assert!(matches!(err, CommandError::App(AppError::NotFound(_))));
        assert!(state.cart().is_empty());
    }

    #[test]
    fn test_show_empty_cart() {
        let state = offline_state();
        let mut out = Vec::new();
        show(&state, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Your cart is empty."));
        assert!(text.contains("Cart: 0 item(s), R$ 0.00"));
    }
}
