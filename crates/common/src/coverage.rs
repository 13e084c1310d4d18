//! Coverage planning: which (account, connection) pairs a run validates
//!
//! The plan is fixed before any UI interaction so every failure can be traced
//! back to a planned step.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::types::{Account, Connection, ConnectionSelector, ExhaustiveFactor};

/// How specific connections are chosen for each planned account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConnectionSelectionPolicy {
    /// First N connections in API order
    #[default]
    Prefix,

    /// First N connections of a per-account shuffle seeded by `seed`
    Seeded { seed: u64 },
}

impl ConnectionSelectionPolicy {
    fn choose<'c>(
        &self,
        account_id: u64,
        connections: &'c [Connection],
        count: usize,
    ) -> Vec<&'c Connection> {
        let count = count.min(connections.len());
        match self {
            ConnectionSelectionPolicy::Prefix => connections.iter().take(count).collect(),
            ConnectionSelectionPolicy::Seeded { seed } => {
                let mut order: Vec<&Connection> = connections.iter().collect();
                let mut rng = StdRng::seed_from_u64(seed ^ account_id);
                order.shuffle(&mut rng);
                order.truncate(count);
                order
            }
        }
    }
}

/// One planned account and the connection filters to exercise for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub account: Account,
    pub connections: Vec<ConnectionSelector>,
}

/// Ordered list of checks for a run; the first entry is always "All Accounts"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveragePlan {
    entries: Vec<PlanEntry>,
}

impl CoveragePlan {
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The aggregate entry the sort/paging matrix runs against
    pub fn representative(&self) -> Option<&PlanEntry> {
        self.entries.first()
    }

    /// Total number of (account, connection) steps
    pub fn pair_count(&self) -> usize {
        self.entries.iter().map(|e| e.connections.len()).sum()
    }
}

/// Build the coverage plan for the selected parent accounts.
///
/// `connections_by_account` holds the connection options known for each
/// selected parent; missing entries plan only the "All Connections" check.
pub fn build_plan(
    selected: &[Account],
    connections_by_account: &HashMap<u64, Vec<Connection>>,
    total_population_count: u64,
    factor: ExhaustiveFactor,
    policy: ConnectionSelectionPolicy,
) -> CoveragePlan {
    let mut entries = Vec::with_capacity(selected.len() + 1);

    entries.push(PlanEntry {
        account: Account::all_accounts(total_population_count),
        connections: vec![ConnectionSelector::AllConnections],
    });

    for account in selected.iter().filter(|a| !a.is_aggregate()) {
        let mut connections = vec![ConnectionSelector::AllConnections];

        if let Some(id) = account.account_id {
            let options = connections_by_account
                .get(&id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            if !options.is_empty() {
                let count = factor.percent_count(options.len());
                connections.extend(
                    policy
                        .choose(id, options, count)
                        .into_iter()
                        .cloned()
                        .map(ConnectionSelector::Specific),
                );
            }
            debug!(
                "Planned {} of {} connections for {}",
                connections.len() - 1,
                options.len(),
                account.display_label
            );
        }

        entries.push(PlanEntry {
            account: account.clone(),
            connections,
        });
    }

    CoveragePlan { entries }
}
