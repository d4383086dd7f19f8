// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent delivery with per-target failure isolation.

use std::future::Future;

use futures::future::join_all;
use tutordesk_core::TutorDeskError;

/// Result of delivering to one target.
#[derive(Debug)]
pub struct Delivery<T> {
    pub target: T,
    pub result: Result<(), TutorDeskError>,
}

/// Send to every target concurrently and collect one outcome per target.
///
/// Outcomes are returned in target order. A failing send never affects the
/// others.
pub async fn fan_out<T, F, Fut>(targets: Vec<T>, send: F) -> Vec<Delivery<T>>
where
    F: Fn(&T) -> Fut,
    Fut: Future<Output = Result<(), TutorDeskError>>,
{
    let results = join_all(targets.iter().map(&send)).await;
    targets
        .into_iter()
        .zip(results)
        .map(|(target, result)| Delivery { target, result })
        .collect()
}

/// Totals of a fan-out round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub total: usize,
    pub failed: usize,
}

impl FanoutReport {
    pub fn of<T>(deliveries: &[Delivery<T>]) -> Self {
        Self {
            total: deliveries.len(),
            failed: deliveries.iter().filter(|d| d.result.is_err()).count(),
        }
    }

    pub fn delivered(&self) -> usize {
        self.total - self.failed
    }
}
