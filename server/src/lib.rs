// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
pub mod calendar;
pub mod comments;
pub mod database;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod routes;
pub mod tasks;
