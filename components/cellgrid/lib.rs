/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A fixed-resolution spatial hash grid for dynamic 2D entities.
//!
//! The grid partitions a bounded rectangular region into cells and tracks
//! many moving, variably-sized clients across them:
//! - multi-cell membership for clients that span cell boundaries
//! - O(1) attach/detach via per-cell linked lists in a slot-map arena
//! - temporal coherence: repositioning that stays inside the same cell
//!   block does no bucket work
//! - range queries deduplicated across cells, so each client is reported
//!   once
//!
//! [`grid::CellGrid`] is the core structure; [`tracker`] is the glue layer
//! for hosts that identify entities by UUID and sync footprints per frame.

pub mod grid;
pub mod tracker;

pub use grid::index::{CellIndex, CellSpan};
pub use grid::{CellGrid, ClientKey, GridConfig, GridError};
pub use tracker::worker::{TrackerCommand, TrackerResponse, TrackerWorker};
pub use tracker::{EntityTracker, Footprint};
