// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod receipt;
pub mod user;

pub use receipt::{NewReceipt, Receipt};
pub use user::{GoogleSignIn, User, UserCredentials, UserResponse};
