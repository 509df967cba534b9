/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Spatial hash grid over a bounded 2D region.
//!
//! Core structures:
//! - `CellGrid`: fixed-resolution partition; each cell heads a doubly-linked
//!   list of membership nodes
//! - `Client`: per-entity bookkeeping (footprint, occupied cell span, and a
//!   row-major table of its nodes for O(1) detachment)
//! - `MemberNode`: arena-allocated list node; links are slot-map keys, not
//!   references
//!
//! A client occupies every cell its footprint rectangle touches. `update`
//! skips all bucket work when the recomputed span is unchanged, which is the
//! common case for per-frame movement. Queries stamp each reported client
//! with a monotonically increasing id so an entity visible through several
//! cells is emitted exactly once.

pub mod index;

use euclid::default::{Box2D, Point2D, Size2D};
use log::debug;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::grid::index::{CellIndex, CellSpan, cell_index, span_of};

new_key_type! {
    /// Stable handle to a client tracked by a [`CellGrid`].
    pub struct ClientKey;
}

new_key_type! {
    /// Arena key for one cell-membership node.
    struct MemberKey;
}

/// Grid construction parameters.
///
/// Geometry is stored as plain scalars so the config serializes without
/// dragging geometry types into the format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// World-space lower bound of the covered region
    pub min_x: f32,
    pub min_y: f32,

    /// World-space upper bound of the covered region
    pub max_x: f32,
    pub max_y: f32,

    /// Cell count along the x axis
    pub cols: u32,

    /// Cell count along the y axis
    pub rows: u32,
}

impl GridConfig {
    /// Build a config from a world rectangle and a cell resolution
    pub fn from_bounds(bounds: Box2D<f32>, cols: u32, rows: u32) -> Self {
        Self {
            min_x: bounds.min.x,
            min_y: bounds.min.y,
            max_x: bounds.max.x,
            max_y: bounds.max.y,
            cols,
            rows,
        }
    }

    /// The covered world rectangle
    pub fn bounds(&self) -> Box2D<f32> {
        Box2D::new(
            Point2D::new(self.min_x, self.min_y),
            Point2D::new(self.max_x, self.max_y),
        )
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_x: -512.0,
            min_y: -512.0,
            max_x: 512.0,
            max_y: 512.0,
            cols: 64,
            rows: 64,
        }
    }
}

/// Errors from grid operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// The handle is stale or was never issued by this grid
    UnknownClient,

    /// The config asked for zero cells on an axis
    ZeroResolution,
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::UnknownClient => write!(f, "client is not present in the grid"),
            GridError::ZeroResolution => write!(f, "grid resolution must be positive on both axes"),
        }
    }
}

impl std::error::Error for GridError {}

/// Per-client bookkeeping stored inside the grid
struct Client<T> {
    position: Point2D<f32>,
    extent: Size2D<f32>,

    /// Occupied cell rectangle; `None` while unlinked
    span: Option<CellSpan>,

    /// One node key per covered cell, row-major in span order
    members: Vec<MemberKey>,

    /// Last query stamp this client was reported at
    last_query: u64,

    payload: T,
}

/// One link in a cell's membership list
struct MemberNode {
    client: ClientKey,
    prev: Option<MemberKey>,
    next: Option<MemberKey>,
}

/// Fixed-resolution spatial hash grid over dynamic, variably-sized clients.
///
/// The grid owns all client records and membership nodes; callers hold
/// opaque [`ClientKey`] handles. All operations are synchronous and touch
/// only the cells covered by the client or query footprint.
pub struct CellGrid<T> {
    bounds: Box2D<f32>,
    cols: u32,
    rows: u32,

    /// Row-major cell array; each slot heads a membership list
    cells: Vec<Option<MemberKey>>,

    clients: SlotMap<ClientKey, Client<T>>,
    members: SlotMap<MemberKey, MemberNode>,

    /// Monotonic stamp for query-time deduplication
    query_stamp: u64,
}

impl<T> CellGrid<T> {
    /// Create a grid covering `config.bounds()` at the configured resolution
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        if config.cols == 0 || config.rows == 0 {
            return Err(GridError::ZeroResolution);
        }
        debug!(
            "cell grid: {}x{} cells over {:?}",
            config.cols,
            config.rows,
            config.bounds()
        );
        Ok(Self {
            bounds: config.bounds(),
            cols: config.cols,
            rows: config.rows,
            cells: vec![None; config.cols as usize * config.rows as usize],
            clients: SlotMap::with_key(),
            members: SlotMap::with_key(),
            query_stamp: 0,
        })
    }

    /// Insert a new client and link it into every cell its footprint covers.
    ///
    /// Negative extent components are clamped to zero, which collapses the
    /// footprint to a single cell.
    pub fn insert(&mut self, position: Point2D<f32>, extent: Size2D<f32>, payload: T) -> ClientKey {
        let extent = sanitize_extent(extent);
        let key = self.clients.insert(Client {
            position,
            extent,
            span: None,
            members: Vec::new(),
            last_query: 0,
            payload,
        });
        self.link(key);
        key
    }

    /// Detach a client from every covered cell and discard it, returning the
    /// payload.
    pub fn remove(&mut self, key: ClientKey) -> Result<T, GridError> {
        if !self.clients.contains_key(key) {
            return Err(GridError::UnknownClient);
        }
        self.unlink(key);
        match self.clients.remove(key) {
            Some(client) => Ok(client.payload),
            None => Err(GridError::UnknownClient),
        }
    }

    /// Store a client's new footprint and re-bucket it if needed.
    ///
    /// When the recomputed cell span matches the current one the stored
    /// membership nodes are left untouched, so most per-frame movement costs
    /// one span computation and nothing else.
    pub fn update(
        &mut self,
        key: ClientKey,
        position: Point2D<f32>,
        extent: Size2D<f32>,
    ) -> Result<(), GridError> {
        let extent = sanitize_extent(extent);
        let candidate = span_of(&self.bounds, self.cols, self.rows, position, extent);
        let Some(client) = self.clients.get_mut(key) else {
            return Err(GridError::UnknownClient);
        };
        client.position = position;
        client.extent = extent;
        if client.span == Some(candidate) {
            return Ok(());
        }
        self.unlink(key);
        self.link(key);
        Ok(())
    }

    /// Reposition a client, keeping its stored extent
    pub fn move_to(&mut self, key: ClientKey, position: Point2D<f32>) -> Result<(), GridError> {
        let extent = self
            .clients
            .get(key)
            .map(|c| c.extent)
            .ok_or(GridError::UnknownClient)?;
        self.update(key, position, extent)
    }

    /// Report every distinct client whose cell span intersects the query
    /// rectangle.
    ///
    /// Results come in row-major cell order, most-recently-inserted first
    /// within a cell; the order is not otherwise guaranteed. Takes `&mut
    /// self` for the dedup stamp only — spans and buckets are not mutated.
    pub fn query(&mut self, center: Point2D<f32>, extent: Size2D<f32>) -> Vec<ClientKey> {
        let extent = sanitize_extent(extent);
        let span = span_of(&self.bounds, self.cols, self.rows, center, extent);
        self.query_stamp += 1;
        let stamp = self.query_stamp;

        let mut found = Vec::new();
        for cell in span.cells() {
            let mut cursor = self.cells[self.cell_offset(cell)];
            while let Some(node_key) = cursor {
                let Some(node) = self.members.get(node_key) else {
                    break;
                };
                cursor = node.next;
                if let Some(client) = self.clients.get_mut(node.client) {
                    if client.last_query != stamp {
                        client.last_query = stamp;
                        found.push(node.client);
                    }
                }
            }
        }
        found
    }

    /// The covered world rectangle
    pub fn bounds(&self) -> Box2D<f32> {
        self.bounds
    }

    /// Cell counts as `(cols, rows)`
    pub fn resolution(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    /// The cell containing a world position (saturating at the boundary)
    pub fn cell_at(&self, position: Point2D<f32>) -> CellIndex {
        cell_index(&self.bounds, self.cols, self.rows, position)
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether the grid tracks no clients
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Whether `key` refers to a live client
    pub fn contains(&self, key: ClientKey) -> bool {
        self.clients.contains_key(key)
    }

    /// A client's stored center position
    pub fn position(&self, key: ClientKey) -> Option<Point2D<f32>> {
        self.clients.get(key).map(|c| c.position)
    }

    /// A client's stored (sanitized) extent
    pub fn extent(&self, key: ClientKey) -> Option<Size2D<f32>> {
        self.clients.get(key).map(|c| c.extent)
    }

    /// The cell rectangle a client currently occupies
    pub fn span(&self, key: ClientKey) -> Option<CellSpan> {
        self.clients.get(key).and_then(|c| c.span)
    }

    /// Borrow a client's payload
    pub fn payload(&self, key: ClientKey) -> Option<&T> {
        self.clients.get(key).map(|c| &c.payload)
    }

    /// Mutably borrow a client's payload
    pub fn payload_mut(&mut self, key: ClientKey) -> Option<&mut T> {
        self.clients.get_mut(key).map(|c| &mut c.payload)
    }

    /// Create membership nodes for every cell in the client's span and
    /// prepend them to the cell lists.
    fn link(&mut self, key: ClientKey) {
        let (position, extent) = match self.clients.get(key) {
            Some(client) => {
                debug_assert!(client.span.is_none(), "client is already linked");
                (client.position, client.extent)
            },
            None => return,
        };

        let span = span_of(&self.bounds, self.cols, self.rows, position, extent);
        let mut table = Vec::with_capacity(span.cell_count());
        for cell in span.cells() {
            let offset = self.cell_offset(cell);
            let head = self.cells[offset];
            let node = self.members.insert(MemberNode {
                client: key,
                prev: None,
                next: head,
            });
            if let Some(old_head) = head {
                if let Some(n) = self.members.get_mut(old_head) {
                    n.prev = Some(node);
                }
            }
            self.cells[offset] = Some(node);
            table.push(node);
        }

        if let Some(client) = self.clients.get_mut(key) {
            client.span = Some(span);
            client.members = table;
        }
    }

    /// Splice the client's nodes out of every cell list. The single
    /// reusable detach primitive; `remove` and `update` both sit on top.
    fn unlink(&mut self, key: ClientKey) {
        let (span, table) = match self.clients.get_mut(key) {
            Some(client) => match client.span.take() {
                Some(span) => (span, std::mem::take(&mut client.members)),
                None => return,
            },
            None => return,
        };
        debug_assert_eq!(table.len(), span.cell_count());

        for (cell, node_key) in span.cells().zip(table) {
            let offset = self.cell_offset(cell);
            let Some(node) = self.members.remove(node_key) else {
                continue;
            };
            debug_assert_eq!(node.client, key);
            match node.prev {
                Some(prev) => {
                    if let Some(p) = self.members.get_mut(prev) {
                        p.next = node.next;
                    }
                },
                // Node was the bucket head.
                None => self.cells[offset] = node.next,
            }
            if let Some(next) = node.next {
                if let Some(n) = self.members.get_mut(next) {
                    n.prev = node.prev;
                }
            }
        }
    }

    fn cell_offset(&self, cell: CellIndex) -> usize {
        cell.y as usize * self.cols as usize + cell.x as usize
    }
}

fn sanitize_extent(extent: Size2D<f32>) -> Size2D<f32> {
    if extent.width < 0.0 || extent.height < 0.0 {
        debug!("clamping degenerate extent {:?}", extent);
        Size2D::new(extent.width.max(0.0), extent.height.max(0.0))
    } else {
        extent
    }
}
