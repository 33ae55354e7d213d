//! services/api/src/lib.rs
//!
//! The MealBuilder web service: HTTP adapters around `meal_builder_core`,
//! the JSON API, the HTML pages and the chat bot.

pub mod adapters;
pub mod bot;
pub mod config;
pub mod error;
pub mod web;
