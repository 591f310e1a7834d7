use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::{
    embedded, group_count, object_id, paginate, populate, populate_embedded, require, with_parent,
};
use bazaar_query::{Clause, Field, FilterSpec, PageSpec, Params, Sort, parse_one_of};
use bazaar_store::{Collection, lookup};
use bson::{Bson, Document, doc};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::auth::Caller;
use crate::entities::{
    BRANDS, DELIVERY_ADDRESSES, ORDER_LISTING, ORDER_STATUSES, ORDERS, OrderField, PRODUCTS, USERS,
};
use crate::error::ApiError;
use crate::input::as_number;
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

const PAYMENT_METHOD: &str = "Cash on Delivery";

/// Buyer, seller of the ordered product, or admin.
fn ensure_party(caller: &Caller, order: &Document) -> Result<(), ApiError> {
    let seller = lookup(order, OrderField::Seller.path())
        .into_iter()
        .find_map(object_id);
    if caller.is_admin() || caller.owns(order, "user") || seller == Some(caller.id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not authorized to access this order"))
    }
}

fn check_quantity(quantity: i64) -> Result<(), ApiError> {
    if quantity <= 0 {
        return Err(ApiError::bad_request("Quantity must be greater than zero"));
    }
    Ok(())
}

fn check_status(status: &str) -> Result<(), ApiError> {
    if !ORDER_STATUSES.contains(&status) {
        return Err(ApiError::bad_request(format!("Invalid order status: {status}")));
    }
    Ok(())
}

/// Product with its brand, and the delivery address out of the buyer's
/// address book.
fn populate_orders(state: &AppState, orders: &mut [Document]) -> Result<(), ApiError> {
    populate(
        state.collection(PRODUCTS).as_ref(),
        orders,
        "product.productId",
        Default::default(),
    )?;
    populate(
        state.collection(BRANDS).as_ref(),
        orders,
        "product.productId.brand",
        Default::default(),
    )?;
    populate_embedded(
        state.collection(USERS).as_ref(),
        orders,
        "user",
        "deliveryAddress",
        DELIVERY_ADDRESSES.field,
    )?;
    Ok(())
}

/// `orderStatus` filters by status. `user=true` limits to the caller's own
/// orders, `createdBy=true` to orders for the caller's products. Without
/// either, non-admins see their own orders.
fn order_filter(params: &Params, caller: &Caller) -> FilterSpec {
    let flag = |name: &str| params.first(name).is_some_and(|v| v.eq_ignore_ascii_case("true"));
    let mine = flag("user");
    let sold = flag("createdBy");

    let mut filter = FilterSpec::new().maybe(parse_one_of(params, "orderStatus", OrderField::Status));
    if mine || (!sold && !caller.is_admin()) {
        filter.push(Clause::equals(OrderField::User, caller.id));
    }
    if sold {
        filter.push(Clause::equals(OrderField::Seller, caller.id));
    }
    filter
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    product_id: String,
    delivery_address_id: String,
    quantity: i64,
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<NewOrder>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        check_quantity(body.quantity)?;
        let product_id = wire::body_id(&body.product_id, "productId")?;
        let address_id = wire::body_id(&body.delivery_address_id, "deliveryAddressId")?;

        let product = require(state.collection(PRODUCTS).as_ref(), &product_id, "Product")?;
        let user = require(state.collection(USERS).as_ref(), &caller.id, "User")?;
        embedded::find(&user, DELIVERY_ADDRESSES, &address_id)?;

        let price = product.get("price").and_then(as_number).unwrap_or(0.0);
        let mut line = doc! {
            "productId": product_id,
            "price": price,
            "quantity": body.quantity,
        };
        for field in ["name", "createdBy"] {
            if let Some(value) = product.get(field) {
                line.insert(field, value.clone());
            }
        }

        let order = state.collection(ORDERS).insert(doc! {
            "user": caller.id,
            "deliveryAddress": address_id,
            "product": line,
            "totalAmount": price * body.quantity as f64,
            "orderStatus": "pending",
            "paymentMethod": PAYMENT_METHOD,
        })?;
        info!(order = ?order.get("_id"), user = %caller.id, product = %product_id, "order placed");
        Ok((
            StatusCode::CREATED,
            wire::message_with("Order placed successfully", "order", order),
        ))
    })
    .await
}

pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let filter = order_filter(&params, &caller);
        let orders = state.collection(ORDERS);
        let mut page = paginate(
            orders.as_ref(),
            &filter,
            &[Sort::newest_first()],
            PageSpec::from_params(&params),
        )?;
        populate_orders(&state, &mut page.items)?;

        let counts: Document = group_count(orders.as_ref(), &filter, OrderField::Status)?
            .into_iter()
            .map(|(status, n)| (status, Bson::Int64(n as i64)))
            .collect();
        let mut out = page.envelope(ORDER_LISTING);
        out.insert("statusCounts", counts);
        Ok(Json(wire::doc_json(out)))
    })
    .await
}

pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&order_id, "Order")?;
        let order = require(state.collection(ORDERS).as_ref(), &id, "Order")?;
        ensure_party(&caller, &order)?;
        let mut docs = [order];
        populate_orders(&state, &mut docs)?;
        let [order] = docs;
        Ok(wire::wrapped("order", order))
    })
    .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    quantity: Option<i64>,
    order_status: Option<String>,
}

/// A new quantity is re-priced at the product's current price.
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<String>,
    JsonBody(body): JsonBody<OrderPatch>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&order_id, "Order")?;
        if let Some(quantity) = body.quantity {
            check_quantity(quantity)?;
        }
        if let Some(status) = &body.order_status {
            check_status(status)?;
        }

        let orders = state.collection(ORDERS);
        let current = require(orders.as_ref(), &id, "Order")?;
        ensure_party(&caller, &current)?;

        let price = match body.quantity {
            None => None,
            Some(_) => {
                let product = lookup(&current, "product.productId")
                    .into_iter()
                    .find_map(object_id)
                    .map(|pid| state.collection(PRODUCTS).get(&pid))
                    .transpose()?
                    .flatten();
                let stored = lookup(&current, "product.price").into_iter().find_map(as_number);
                product
                    .as_ref()
                    .and_then(|p| p.get("price"))
                    .and_then(as_number)
                    .or(stored)
            }
        };

        let (_, saved) = with_parent(orders.as_ref(), &id, "Order", |order| {
            if let Some(quantity) = body.quantity {
                let price = price.unwrap_or(0.0);
                if let Ok(line) = order.get_document_mut("product") {
                    line.insert("quantity", quantity);
                    line.insert("price", price);
                }
                order.insert("totalAmount", price * quantity as f64);
            }
            if let Some(status) = body.order_status {
                order.insert("orderStatus", status);
            }
            Ok(())
        })?;
        Ok(wire::message_with("Order updated successfully", "order", saved))
    })
    .await
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&order_id, "Order")?;
        let orders = state.collection(ORDERS);
        let order = require(orders.as_ref(), &id, "Order")?;
        caller.ensure_owner(&order, "user", "Only the buyer can delete an order")?;
        orders.delete(&id)?;
        info!(order = %id, "order deleted");
        Ok(wire::message("Order deleted successfully"))
    })
    .await
}
