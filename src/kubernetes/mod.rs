// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kind-agnostic cluster access: client creation, API discovery and dynamic CRUD.

pub mod client;
pub mod discovery;
pub mod document;
pub mod dynamic;

pub use client::create_client;
pub use discovery::{ApiResourceDescriptor, DiscoveryResolver, GroupVersionResource};
pub use document::ResourceDocument;
pub use dynamic::DynamicResourceClient;
