//! Request extractors whose rejections render as `{"error": ...}`

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// [`axum::extract::Query`] with [`AppError`] rejections
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

/// [`axum::extract::Path`] with [`AppError`] rejections
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

/// [`axum::Json`] request body with [`AppError`] rejections
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);
