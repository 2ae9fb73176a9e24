//! HTTP handlers

pub mod agent;
pub mod health;
pub mod sessions;

use axum::extract::FromRequest;

use crate::AppError;

/// `Json` extractor whose rejections use the `AppError` body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
