// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support-desk engine for TutorDesk.
//!
//! Turns chat platform and tracker events into store updates and outbound
//! notifications:
//!
//! - [`Correlator`] groups student questions into conversation windows
//! - [`Resolver`] marks groups answered on staff replies and reactions
//! - [`SubscriptionRegistry`] links chat threads to tracker tickets
//! - [`EscalationPoller`] escalates unanswered questions past the SLA
//! - [`EventDispatcher`] routes inbound webhooks by the author's role

pub mod correlator;
pub mod dispatch;
pub mod escalation;
pub mod fanout;
pub mod resolver;
pub mod roles;
pub mod shift;
pub mod shutdown;
pub mod subscriptions;
pub mod texts;

pub use correlator::Correlator;
pub use dispatch::{DispatchOutcome, EventDispatcher};
pub use escalation::{CycleReport, EscalationPoller, PollerState};
pub use fanout::FanoutReport;
pub use resolver::Resolver;
pub use roles::{RoleClassifier, UserRole};
pub use shift::ShiftPolicy;
pub use shutdown::install_signal_handler;
pub use subscriptions::{CommandOutcome, SubscriptionRegistry};
