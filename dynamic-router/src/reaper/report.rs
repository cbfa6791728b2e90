/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Outcome and error types of a removal attempt.

use crate::broker::{BrokerError, ChannelKind, ChannelRef};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A removal attempt that could not start at all.
#[derive(Debug)]
pub enum RemovalError {
    /// The broker's administrative interface could not be reached.
    AdminConnection { target: String, source: BrokerError },
}

impl Display for RemovalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalError::AdminConnection { target, source } => write!(
                f,
                "unable to open admin session to remove {target}: {source}"
            ),
        }
    }
}

impl Error for RemovalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RemovalError::AdminConnection { source, .. } => Some(source),
        }
    }
}

/// The broker object a per-item failure refers to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RemovalItem {
    /// Listing routes matching a needle.
    RouteListing(String),
    /// Listing channels of a kind matching a needle.
    ChannelListing(ChannelKind, String),
    /// Stopping a route.
    RouteStop(String),
    /// Removing a stopped route.
    Route(String),
    /// Removing a channel.
    Channel(ChannelRef),
}

impl Display for RemovalItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalItem::RouteListing(needle) => write!(f, "list routes matching '{needle}'"),
            RemovalItem::ChannelListing(kind, needle) => {
                write!(f, "list {kind}s matching '{needle}'")
            }
            RemovalItem::RouteStop(route_id) => write!(f, "stop route '{route_id}'"),
            RemovalItem::Route(route_id) => write!(f, "remove route '{route_id}'"),
            RemovalItem::Channel(channel) => write!(f, "remove {channel}"),
        }
    }
}

/// One best-effort step that failed; the rest of the removal went on.
#[derive(Debug)]
pub struct ItemRemovalError {
    pub item: RemovalItem,
    pub source: BrokerError,
}

impl Display for ItemRemovalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to {}: {}", self.item, self.source)
    }
}

impl Error for ItemRemovalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// What a removal attempt achieved. A non-empty `failures` list is a partial
/// removal: orphaned broker objects may remain.
#[derive(Debug, Default)]
pub struct RemovalReport {
    pub routes_removed: Vec<String>,
    pub channels_removed: Vec<ChannelRef>,
    pub failures: Vec<ItemRemovalError>,
}

impl RemovalReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn merge(&mut self, other: RemovalReport) {
        self.routes_removed.extend(other.routes_removed);
        self.channels_removed.extend(other.channels_removed);
        self.failures.extend(other.failures);
    }
}
