/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Tracker worker thread for hosts with concurrent callers.
//!
//! The grid provides no internal locking, so embeddings that touch it from
//! several threads route every operation through this worker: one thread
//! owns the tracker and drains a command channel, which serializes all grid
//! access. Commands queue; each runs to completion before the next starts.

use crossbeam_channel::{Receiver, Sender};
use log::warn;
use std::thread;
use uuid::Uuid;

use crate::grid::{GridConfig, GridError};
use crate::tracker::{EntityTracker, Footprint};

/// Command to send to the tracker worker
pub enum TrackerCommand {
    /// Start tracking an entity
    Track(Uuid, Footprint),

    /// Per-frame footprint sync
    Sync(Uuid, Footprint),

    /// Stop tracking an entity
    Forget(Uuid),

    /// Proximity query, answered with [`TrackerResponse::Nearby`]
    Query(Footprint),

    /// Shut down the worker
    Shutdown,
}

/// Response from the tracker worker
pub enum TrackerResponse {
    /// Entity ids matching a `Query`, in command order
    Nearby(Vec<Uuid>),
}

/// Handle to a tracker running on a background thread
pub struct TrackerWorker {
    command_tx: Sender<TrackerCommand>,
    response_rx: Receiver<TrackerResponse>,
}

impl TrackerWorker {
    /// Create and start a new tracker worker. The tracker is built on the
    /// calling thread so config errors surface here, then moved to the
    /// worker.
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        let tracker = EntityTracker::new(config)?;
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (response_tx, response_rx) = crossbeam_channel::unbounded();

        thread::spawn(move || {
            run_tracker_worker(tracker, command_rx, response_tx);
        });

        Ok(Self {
            command_tx,
            response_rx,
        })
    }

    /// Send a command to the worker
    pub fn send_command(&self, command: TrackerCommand) {
        let _ = self.command_tx.send(command);
    }

    /// Try to receive a response (non-blocking)
    pub fn try_recv_response(&self) -> Option<TrackerResponse> {
        self.response_rx.try_recv().ok()
    }

    /// Receive a response, blocking until the worker answers
    pub fn recv_response(&self) -> Option<TrackerResponse> {
        self.response_rx.recv().ok()
    }
}

/// Drain commands until shutdown or until every sender is dropped
fn run_tracker_worker(
    mut tracker: EntityTracker,
    command_rx: Receiver<TrackerCommand>,
    response_tx: Sender<TrackerResponse>,
) {
    for command in command_rx.iter() {
        match command {
            TrackerCommand::Track(id, footprint) => {
                tracker.track(id, footprint);
            },
            TrackerCommand::Sync(id, footprint) => {
                if !tracker.sync(id, footprint) {
                    warn!("sync for untracked entity {id}");
                }
            },
            TrackerCommand::Forget(id) => {
                if !tracker.forget(id) {
                    warn!("forget for untracked entity {id}");
                }
            },
            TrackerCommand::Query(range) => {
                let _ = response_tx.send(TrackerResponse::Nearby(tracker.nearby(range)));
            },
            TrackerCommand::Shutdown => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::default::{Box2D, Point2D, Size2D};

    fn test_worker() -> TrackerWorker {
        let bounds = Box2D::new(Point2D::new(0.0, 0.0), Point2D::new(16.0, 16.0));
        TrackerWorker::new(GridConfig::from_bounds(bounds, 16, 16)).unwrap()
    }

    fn footprint(x: f32, y: f32) -> Footprint {
        Footprint::new(Point2D::new(x, y), Size2D::new(1.0, 1.0))
    }

    #[test]
    fn test_worker_rejects_bad_config() {
        let bounds = Box2D::new(Point2D::new(0.0, 0.0), Point2D::new(16.0, 16.0));
        assert!(TrackerWorker::new(GridConfig::from_bounds(bounds, 0, 0)).is_err());
    }

    #[test]
    fn test_worker_track_query_roundtrip() {
        let worker = test_worker();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        worker.send_command(TrackerCommand::Track(a, footprint(8.0, 8.0)));
        worker.send_command(TrackerCommand::Track(b, footprint(8.4, 8.4)));
        worker.send_command(TrackerCommand::Query(footprint(8.0, 8.0)));

        let TrackerResponse::Nearby(found) = worker.recv_response().unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&a));
        assert!(found.contains(&b));
    }

    #[test]
    fn test_worker_sync_and_forget() {
        let worker = test_worker();
        let id = Uuid::new_v4();

        worker.send_command(TrackerCommand::Track(id, footprint(2.0, 2.0)));
        worker.send_command(TrackerCommand::Sync(id, footprint(13.0, 13.0)));
        worker.send_command(TrackerCommand::Query(footprint(13.0, 13.0)));
        let TrackerResponse::Nearby(found) = worker.recv_response().unwrap();
        assert_eq!(found, vec![id]);

        worker.send_command(TrackerCommand::Forget(id));
        worker.send_command(TrackerCommand::Query(footprint(13.0, 13.0)));
        let TrackerResponse::Nearby(found) = worker.recv_response().unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_worker_shutdown_closes_responses() {
        let worker = test_worker();
        worker.send_command(TrackerCommand::Shutdown);
        // After shutdown the response channel eventually disconnects.
        assert!(worker.recv_response().is_none());
    }
}
