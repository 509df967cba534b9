/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Entity-tracking glue between a host scene and the spatial grid.
//!
//! The host owns its entities and identifies them by UUID; this layer maps
//! those ids to grid handles and drives the per-frame footprint sync. The
//! grid never sees host objects — only [`Footprint`] values, which the host
//! derives from whatever world geometry it has (typically a mesh's
//! world-space bounding box collapsed to 2D).

pub mod worker;

use std::collections::HashMap;

use euclid::default::{Box2D, Point2D, Size2D};
use log::debug;
use uuid::Uuid;

use crate::grid::{CellGrid, ClientKey, GridConfig, GridError};

/// A 2D footprint: center position plus axis-aligned width/height.
///
/// This is the boundary value between the host and the grid; by the time it
/// reaches this layer it is plain data with no geometry pipeline attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub position: Point2D<f32>,
    pub extent: Size2D<f32>,
}

impl Footprint {
    pub fn new(position: Point2D<f32>, extent: Size2D<f32>) -> Self {
        Self { position, extent }
    }

    /// Collapse an axis-aligned world rectangle to center + size
    pub fn from_rect(rect: Box2D<f32>) -> Self {
        Self {
            position: rect.center(),
            extent: rect.size(),
        }
    }
}

/// Tracks host entities in a [`CellGrid`], keyed by UUID.
pub struct EntityTracker {
    grid: CellGrid<Uuid>,
    clients: HashMap<Uuid, ClientKey>,
}

impl EntityTracker {
    /// Create a tracker over a fresh grid
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        Ok(Self {
            grid: CellGrid::new(config)?,
            clients: HashMap::new(),
        })
    }

    /// Start tracking an entity. Re-tracking an id replaces its previous
    /// registration.
    pub fn track(&mut self, id: Uuid, footprint: Footprint) {
        if let Some(old) = self.clients.remove(&id) {
            debug!("re-tracking entity {id}, replacing previous registration");
            let _ = self.grid.remove(old);
        }
        let key = self.grid.insert(footprint.position, footprint.extent, id);
        self.clients.insert(id, key);
    }

    /// Per-frame footprint sync. Cheap when the entity stays inside its
    /// current cell block. Returns `false` for untracked ids.
    pub fn sync(&mut self, id: Uuid, footprint: Footprint) -> bool {
        let Some(&key) = self.clients.get(&id) else {
            return false;
        };
        self.grid
            .update(key, footprint.position, footprint.extent)
            .is_ok()
    }

    /// Stop tracking an entity. Returns `false` for untracked ids.
    pub fn forget(&mut self, id: Uuid) -> bool {
        match self.clients.remove(&id) {
            Some(key) => self.grid.remove(key).is_ok(),
            None => false,
        }
    }

    /// Ids of every tracked entity whose cell span intersects the queried
    /// range, each reported once.
    pub fn nearby(&mut self, range: Footprint) -> Vec<Uuid> {
        self.grid
            .query(range.position, range.extent)
            .into_iter()
            .filter_map(|key| self.grid.payload(key).copied())
            .collect()
    }

    /// Number of tracked entities
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no entities are tracked
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Borrow the underlying grid
    pub fn grid(&self) -> &CellGrid<Uuid> {
        &self.grid
    }
}
