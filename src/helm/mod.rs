// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm release lifecycle and repository index management

pub mod backend;
pub mod chart;
pub mod manager;
pub mod release;
pub mod repository;
pub mod settings;

pub use backend::{ChartRequest, HelmBackend, HelmCli};
pub use chart::ChartMetadata;
pub use manager::{ChartSpec, HelmReleaseManager};
pub use release::{HelmRelease, ReleaseStatus};
pub use repository::{HelmRepositoryStore, RepositoryEntry, RepositorySummary};
pub use settings::HelmSettings;
