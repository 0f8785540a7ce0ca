//! Incident tickets and mapping clustered texts back onto them.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clustering::{ClusteringAnomaly, ThemeReport};

/// An incident ticket as exported by the ticketing system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ticket {
    pub id: String,
    pub number: String,
    pub short_description: String,
    pub state: String,
    pub priority: String,
}

impl Ticket {
    pub fn new(id: impl Into<String>, short_description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            short_description: short_description.into(),
            ..Self::default()
        }
    }
}

/// Envelope returned by the ticketing API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentFeed {
    #[serde(default)]
    pub result: Vec<Ticket>,
}

impl IncidentFeed {
    /// Parse either the `{"result": [...]}` envelope or a bare ticket array.
    pub fn from_json(content: &str) -> serde_json::Result<Vec<Ticket>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Payload {
            Feed(IncidentFeed),
            Tickets(Vec<Ticket>),
        }

        Ok(match serde_json::from_str(content)? {
            Payload::Feed(feed) => feed.result,
            Payload::Tickets(tickets) => tickets,
        })
    }
}

/// One labeled cluster of tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredTickets {
    pub description: String,
    pub tickets: Vec<Ticket>,
}

/// Clustered tickets for a whole feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredTicketReport {
    pub clusters: Vec<ClusteredTickets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<ClusteringAnomaly>,
    pub created_at: DateTime<Utc>,
}

/// Attach tickets to each labeled cluster by matching member texts against
/// `short_description`.
///
/// Repeated texts consume distinct tickets in input order. Members with no
/// remaining match are skipped.
pub fn rejoin_tickets(report: &ThemeReport, tickets: &[Ticket]) -> ClusteredTicketReport {
    let mut by_text: HashMap<&str, VecDeque<&Ticket>> = HashMap::new();
    for ticket in tickets {
        by_text
            .entry(ticket.short_description.as_str())
            .or_default()
            .push_back(ticket);
    }

    let mut unmatched = 0usize;
    let clusters = report
        .clusters
        .iter()
        .map(|cluster| {
            let tickets = cluster
                .members
                .iter()
                .filter_map(|text| {
                    let found = by_text
                        .get_mut(text.as_str())
                        .and_then(|queue| queue.pop_front())
                        .cloned();
                    if found.is_none() {
                        unmatched += 1;
                    }
                    found
                })
                .collect();
            ClusteredTickets {
                description: cluster.description.clone(),
                tickets,
            }
        })
        .collect();

    if unmatched > 0 {
        tracing::debug!(unmatched, "Cluster members without a matching ticket");
    }

    ClusteredTicketReport {
        clusters,
        anomaly: report.anomaly.clone(),
        created_at: report.created_at,
    }
}
