//! Cart route handlers.
//!
//! Every handler opens the session's cart through [`CartSessions`], which
//! reconciles it first if the signed-in user changed since the last request.
//! Responses are the full cart as JSON so clients can re-render in one step.
//!
//! [`CartSessions`]: crate::cart::CartSessions

use axum::{Form, Json, extract::State};
use cornershop_core::{CartLine, CartSnapshot, CurrencyCode, Identity, Price, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::cart::{CartStore, SessionCartSlot};
use crate::db::CartItemRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// The cart a request works on.
pub type SessionCart = CartStore<CartItemRepository, SessionCartSlot>;

/// Longest accepted product ID.
const MAX_PRODUCT_ID_LEN: usize = 128;

/// Decimal places a unit price may carry. Matches `NUMERIC(12, 2)`.
const PRICE_SCALE: u32 = 2;

/// Exclusive upper bound on a unit price. Matches `NUMERIC(12, 2)`.
const PRICE_LIMIT: i64 = 10_000_000_000;

/// A cart line as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: String,
    pub name: String,
    pub image_ref: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_price: String,
}

/// The cart as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u64,
    pub subtotal: String,
    pub signed_in: bool,
}

impl CartView {
    /// Build the view of a cart's lines.
    #[must_use]
    pub fn new(lines: &CartSnapshot, identity: Identity, currency: CurrencyCode) -> Self {
        let format = |amount: Decimal| Price::new(amount, currency).display();

        Self {
            lines: lines
                .lines()
                .iter()
                .map(|line| CartLineView {
                    product_id: line.product_id.to_string(),
                    name: line.name.clone(),
                    image_ref: line.image_ref.clone(),
                    quantity: line.quantity,
                    unit_price: format(line.unit_price),
                    line_price: format(line.line_total()),
                })
                .collect(),
            item_count: lines.total_item_count(),
            subtotal: lines.subtotal(currency).display(),
            signed_in: identity.is_identified(),
        }
    }

    /// Build the view of an open cart.
    #[must_use]
    pub fn of(cart: &SessionCart, currency: CurrencyCode) -> Self {
        Self::new(cart.lines(), cart.identity(), currency)
    }
}

/// Cart count response.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartCount {
    pub count: u64,
}

/// Form data for adding to cart.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl AddToCartForm {
    fn into_line(self) -> Result<CartLine> {
        let product_id = parse_product_id(&self.product_id)?;

        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }
        let unit_price = parse_unit_price(self.unit_price)?;

        let quantity = self.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(AppError::BadRequest(
                "quantity must be at least 1".to_string(),
            ));
        }

        Ok(CartLine::new(
            product_id,
            name,
            unit_price,
            self.image_ref.unwrap_or_default(),
        )
        .with_quantity(quantity))
    }
}

/// Form data for updating a line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: i64,
}

/// Form data for removing a line.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

fn parse_product_id(raw: &str) -> Result<ProductId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "product_id must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_PRODUCT_ID_LEN {
        return Err(AppError::BadRequest("product_id is too long".to_string()));
    }
    Ok(ProductId::new(trimmed))
}

/// Accept prices the cart table can store exactly.
fn parse_unit_price(price: Decimal) -> Result<Decimal> {
    if price.is_sign_negative() {
        return Err(AppError::BadRequest(
            "unit_price must not be negative".to_string(),
        ));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(AppError::BadRequest(format!(
            "unit_price must have at most {PRICE_SCALE} decimal places"
        )));
    }
    if price >= Decimal::from(PRICE_LIMIT) {
        return Err(AppError::BadRequest("unit_price is too large".to_string()));
    }
    Ok(price)
}

/// Open the request's cart under the session's current identity.
async fn open_cart(state: &AppState, session: &Session, auth: &OptionalAuth) -> SessionCart {
    state.carts().open(session, auth.identity()).await
}

/// Remember the cart for the next request and render it.
async fn respond(state: &AppState, cart: &SessionCart) -> Json<CartView> {
    state.carts().retain(cart).await;
    Json(CartView::of(cart, state.config().cart.currency))
}

/// Show the cart.
#[instrument(skip(state, session, auth))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Json<CartView> {
    let cart = open_cart(&state, &session, &auth).await;
    Json(CartView::of(&cart, state.config().cart.currency))
}

/// Add a product to the cart.
#[instrument(skip(state, session, auth))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Json<CartView>> {
    let line = form.into_line()?;
    let quantity = line.quantity.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[
            ("product_id", line.product_id.as_str()),
            ("quantity", quantity.as_str()),
        ]),
    );

    let mut cart = open_cart(&state, &session, &auth).await;
    cart.add_line(line).await;
    Ok(respond(&state, &cart).await)
}

/// Set a line's quantity. Zero or negative removes it.
#[instrument(skip(state, session, auth))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Json<CartView>> {
    let product_id = parse_product_id(&form.product_id)?;

    let mut cart = open_cart(&state, &session, &auth).await;
    cart.set_quantity(&product_id, form.quantity).await;
    Ok(respond(&state, &cart).await)
}

/// Remove a line.
#[instrument(skip(state, session, auth))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Json<CartView>> {
    let product_id = parse_product_id(&form.product_id)?;
    add_breadcrumb(
        "cart",
        "Removed from cart",
        Some(&[("product_id", product_id.as_str())]),
    );

    let mut cart = open_cart(&state, &session, &auth).await;
    cart.remove_line(&product_id).await;
    Ok(respond(&state, &cart).await)
}

/// Empty the cart.
#[instrument(skip(state, session, auth))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Json<CartView> {
    add_breadcrumb("cart", "Cleared cart", None);

    let mut cart = open_cart(&state, &session, &auth).await;
    cart.clear().await;
    respond(&state, &cart).await
}

/// Total item count, for the header badge.
#[instrument(skip(state, session, auth))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Json<CartCount> {
    let cart = open_cart(&state, &session, &auth).await;
    Json(CartCount {
        count: cart.total_item_count(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cornershop_core::UserId;

    use super::*;

    fn form(price: &str, quantity: Option<u32>) -> AddToCartForm {
        AddToCartForm {
            product_id: " mug-blue ".to_owned(),
            name: "Blue Mug".to_owned(),
            unit_price: price.parse().unwrap(),
            image_ref: None,
            quantity,
        }
    }

    #[test]
    fn test_add_form_builds_line() {
        let line = form("12.50", Some(3)).into_line().unwrap();
        assert_eq!(line.product_id, ProductId::new("mug-blue"));
        assert_eq!(line.quantity, 3);
        assert_eq!(line.image_ref, "");
    }

    #[test]
    fn test_add_form_defaults_to_one() {
        assert_eq!(form("12.50", None).into_line().unwrap().quantity, 1);
    }

    #[test]
    fn test_add_form_rejects_bad_input() {
        assert!(matches!(
            form("-1.00", None).into_line(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            form("1.00", Some(0)).into_line(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_product_id("   "),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_product_id(&"x".repeat(MAX_PRODUCT_ID_LEN + 1)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_unit_price_must_fit_cart_table() {
        for bad in ["12.345", "0.001", "10000000000", "79228162514264337593543950335"] {
            assert!(
                matches!(form(bad, None).into_line(), Err(AppError::BadRequest(_))),
                "{bad} should be rejected"
            );
        }

        assert_eq!(
            form("12.500", None).into_line().unwrap().unit_price,
            Decimal::new(1250, 2)
        );
        assert!(form("9999999999.99", None).into_line().is_ok());
        assert!(form("0", None).into_line().is_ok());
    }

    #[test]
    fn test_cart_view_formats_prices() {
        let lines = CartSnapshot::from_lines([
            CartLine::new("mug", "Mug", Decimal::new(1250, 2), "/img/mug.webp").with_quantity(2),
            CartLine::new("tee", "Tee", Decimal::new(2000, 2), "/img/tee.webp"),
        ]);
        let user = Identity::User(UserId::new(uuid::Uuid::new_v4()));

        let view = CartView::new(&lines, user, CurrencyCode::USD);

        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, "$45.00");
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.lines.first().unwrap().line_price, "$25.00");
        assert!(view.signed_in);
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::new(&CartSnapshot::new(), Identity::Anonymous, CurrencyCode::EUR);
        assert_eq!(view.item_count, 0);
        assert_eq!(view.subtotal, "€0.00");
        assert!(!view.signed_in);
    }
}
