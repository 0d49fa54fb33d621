//! `vitrine admin ...`
//!
//! Every command goes through the admin panel view, so only admins reach the
//! product controls.

use std::io::Write;

use clap::Args;

use vitrine_core::ProductForm;
use vitrine_storefront::views::{AdminPanel, ProductManager};
use vitrine_storefront::{AppError, AppState};

use super::{CommandResult, parse_id, write_product};

/// Product form fields, as typed.
#[derive(Debug, Args)]
pub struct ProductFields {
    #[arg(long)]
    pub title: String,
    /// Price; anything that is not a non-negative number is stored as 0
    #[arg(long, default_value = "")]
    pub price: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Image URL
    #[arg(long, default_value = "")]
    pub thumbnail: String,
}

/// Fields to change on an existing product; omitted ones keep their value.
#[derive(Debug, Args)]
pub struct ProductPatch {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub price: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub thumbnail: Option<String>,
}

impl ProductPatch {
    fn apply(self, mut form: ProductForm) -> ProductForm {
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(price) = self.price {
            form.price = price;
        }
        if let Some(description) = self.description {
            form.description = description;
        }
        if let Some(thumbnail) = self.thumbnail {
            form.thumbnail = thumbnail;
        }
        form
    }
}

impl From<ProductFields> for ProductForm {
    fn from(fields: ProductFields) -> Self {
        Self {
            title: fields.title,
            price: fields.price,
            description: fields.description,
            thumbnail: fields.thumbnail,
        }
    }
}

/// List products with management controls, or why they are unavailable.
pub fn panel(state: &mut AppState, out: &mut impl Write) -> CommandResult {
    let manager = manager(state)?;

    if let Some(error) = manager.error() {
        writeln!(out, "{error}")?;
    }
    for product in manager.products() {
        write_product(out, product)?;
    }
    writeln!(out, "{} product(s).", manager.products().len())?;
    Ok(())
}

pub async fn create(state: &mut AppState, fields: ProductFields, out: &mut impl Write) -> CommandResult {
    let rows = manager(state)?.create(fields.into()).await?;
    for product in &rows {
        write!(out, "Created ")?;
        write_product(out, product)?;
    }
    Ok(())
}

pub async fn update(
    state: &mut AppState,
    id: &str,
    patch: ProductPatch,
    out: &mut impl Write,
) -> CommandResult {
    let id = parse_id(id);
    let mut manager = manager(state)?;
    let current = manager
        .products()
        .iter()
        .find(|p| p.id == id)
        .map(ProductForm::from_product)
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    let rows = manager.update(&id, patch.apply(current)).await?;
    match rows.first() {
        Some(product) => {
            write!(out, "Updated ")?;
            write_product(out, product)?;
        }
        None => writeln!(out, "No product with id {id} was updated.")?,
    }
    Ok(())
}

pub async fn delete(state: &mut AppState, id: &str, out: &mut impl Write) -> CommandResult {
    let id = parse_id(id);
    manager(state)?.delete(&id).await?;
    writeln!(out, "Deleted product {id}.")?;
    Ok(())
}

fn manager(state: &mut AppState) -> Result<ProductManager<'_>, AppError> {
    match AdminPanel::for_state(state) {
        AdminPanel::Manage(manager) => Ok(manager),
        panel => Err(AppError::Unauthorized(
            panel.notice().unwrap_or_default().to_string(),
        )),
    }
}
