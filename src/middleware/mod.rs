// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, security, panic handling).

pub mod auth;
pub mod panic;
pub mod security;

pub use auth::{require_auth, AuthUser};
