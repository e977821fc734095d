//! Checkout backend-for-frontend for Agora events: prices carts across
//! currencies, applies discount codes and submits orders to the ticketing
//! backend.
//!
//! The HTTP surface in [`routes`] is stateless and prices each request with
//! [`pricing::PricingEngine`]. UIs that embed the crate and keep a buyer's
//! state in-process use [`checkout::CheckoutSession`] instead: it owns the
//! cart and discount, drives the `form -> payment -> success` steps, and
//! republishes totals through a [`pricing::LiveSummary`] on every change.

pub mod checkout;
pub mod client;
pub mod config;
pub mod converter;
pub mod handlers;
pub mod models;
pub mod pricing;
pub mod routes;
pub mod state;
pub mod utils;
