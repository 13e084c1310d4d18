//! Connections page validation run
//!
//! One run fetches the API snapshot, plans coverage, then drives the UI in
//! this order:
//!
//! ```text
//! 1     account dropdown integrity
//! 2.1   All Accounts + All Connections
//!       sort option x page size matrix on that scope
//! 2.2+  remaining planned accounts and connections
//! 3     Connection GUID filter
//! 4     reset to default
//! ```
//!
//! Only setup problems end a run early; everything else lands in the report.

use aerialink_common::{
    build_plan, select_accounts, Account, Connection, ConnectionSelector, ExhaustiveFactor,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::api::{self, category_counts_url, connection_url, ConnectionsApi, ResponseCache};
use crate::checks::{check_account_dropdown, check_connection_guid, check_reset_to_default};
use crate::config::ValidatorConfig;
use crate::driver::{Expectations, ReconciliationDriver};
use crate::error::{E2eError, E2eResult};
use crate::locators::LocatorMap;
use crate::page::Page;
use crate::report::{Reporter, RunReport};
use crate::screen::ConnectionsScreen;
use crate::step::{guarded, StepResult};
use crate::verifier::SortPagingVerifier;

pub struct ConnectionsValidator<'a, P: Page + ?Sized, A: ConnectionsApi + ?Sized> {
    page: &'a mut P,
    api: &'a A,
    locators: &'a LocatorMap,
    config: &'a ValidatorConfig,
}

impl<'a, P: Page + ?Sized, A: ConnectionsApi + ?Sized> ConnectionsValidator<'a, P, A> {
    pub fn new(
        page: &'a mut P,
        api: &'a A,
        locators: &'a LocatorMap,
        config: &'a ValidatorConfig,
    ) -> Self {
        Self {
            page,
            api,
            locators,
            config,
        }
    }

    /// Validate the Connections page at `factor`, bounded by the step timeout
    pub async fn run(&mut self, factor: ExhaustiveFactor) -> E2eResult<RunReport> {
        let limit = self.config.timeouts.step();
        match tokio::time::timeout(limit, self.validate(factor)).await {
            Ok(result) => result,
            Err(_) => Err(E2eError::Timeout(format!(
                "Connections validation at {} ({} ms)",
                factor,
                limit.as_millis()
            ))),
        }
    }

    async fn validate(&mut self, factor: ExhaustiveFactor) -> E2eResult<RunReport> {
        let config = self.config;
        let api = self.api;
        let base_url = api.base_url().to_string();
        let counts_url = category_counts_url(&base_url);
        let limit = config.timeouts.guard();

        info!("Validating Connections page at exhaustiveness {}", factor);
        if !factor.is_canonical() {
            warn!("Exhaustiveness {} is not one of the canonical values", factor);
        }

        let mut cache = ResponseCache::new();
        let mut reporter = Reporter::new();

        let counts = api::category_counts(api, &mut cache).await?;
        let parents = counts.parents();
        if parents.is_empty() {
            return Err(E2eError::Setup(format!("{} lists no parent accounts", counts_url)));
        }
        let grand_total = counts.grand_total();
        info!("API: {} parent account(s), grand total {}", parents.len(), grand_total);

        let mut screen =
            ConnectionsScreen::new(&mut *self.page, self.locators, config.timeouts.clone());

        let parent_ids: Vec<u64> = parents.iter().filter_map(|a| a.account_id).collect();
        let (step, row) = guarded(
            "Validate account dropdown",
            limit,
            check_account_dropdown(
                &mut screen,
                &parent_ids,
                &counts_url,
                config.dropdown_tolerance,
            ),
        )
        .await;
        reporter.record_step(step);
        if let Some(row) = row {
            reporter.append_row(row);
        }

        let selected = select_accounts(&parents, factor);
        info!("Sampled {} of {} parent account(s)", selected.len(), parents.len());

        let mut connections_by_account = HashMap::new();
        for account in &selected {
            let Some(account_id) = account.account_id else {
                continue;
            };
            let (step, fetched) = guarded(
                format!("Fetch connections of [{}]", account_id),
                limit,
                api::account_connections(api, &mut cache, account_id),
            )
            .await;
            reporter.record_step(step);
            if let Some(fetched) = fetched {
                connections_by_account.insert(account_id, fetched.to_connections(account_id));
            }
        }

        let plan = build_plan(
            &selected,
            &connections_by_account,
            grand_total,
            factor,
            config.connection_selection,
        );
        info!(
            "Coverage plan: {} account(s), {} pair(s)",
            plan.len(),
            plan.pair_count()
        );
        let expectations = Expectations::new(base_url.clone(), connections_by_account);

        {
            let mut driver = ReconciliationDriver::new(&mut screen, &expectations);
            if let Some(entry) = plan.representative() {
                reporter.extend_rows(driver.reconcile_entry(0, entry).await);
            }
            reporter.extend_steps(driver.take_steps());
        }

        {
            let mut verifier = SortPagingVerifier::new(&mut screen);
            let checks = verifier
                .verify_sort_and_paging(&config.sort_options, &config.page_sizes)
                .await;
            reporter.extend_page_checks(checks);
            reporter.extend_steps(verifier.take_steps());
        }

        {
            let mut driver = ReconciliationDriver::new(&mut screen, &expectations);
            for (index, entry) in plan.entries().iter().enumerate().skip(1) {
                reporter.extend_rows(driver.reconcile_entry(index, entry).await);
            }
            reporter.extend_steps(driver.take_steps());
        }

        let can_reset = screen.can_reset();
        if !can_reset && (config.check_connection_guid || config.check_reset) {
            info!("No Reset button configured, skipping the GUID filter and reset checks");
        }

        if config.check_connection_guid && can_reset {
            let entries = plan
                .entries()
                .iter()
                .map(|e| (&e.account, e.connections.as_slice()));
            match first_specific_connection(entries) {
                Some((account, connection)) => {
                    let owner = connection.owner_account_id;
                    let (step, detail) = guarded(
                        format!("Fetch connection {} of [{}]", connection.connection_id, owner),
                        limit,
                        api::connection_detail(api, &mut cache, owner, &connection.connection_id),
                    )
                    .await;
                    reporter.record_step(step);

                    let guid = detail
                        .and_then(|d| d.connection_guid)
                        .or_else(|| connection.connection_guid.clone())
                        .filter(|g| !g.trim().is_empty());
                    match guid {
                        Some(guid) => {
                            let scenario =
                                format!("{} + {}", account.display_label, connection.token());
                            let url = connection_url(&base_url, owner, &connection.connection_id);
                            let (step, row) = guarded(
                                format!("Filter by Connection GUID {}", guid),
                                limit,
                                check_connection_guid(&mut screen, &scenario, &guid, &url),
                            )
                            .await;
                            reporter.record_step(step);
                            if let Some(row) = row {
                                reporter.append_row(row);
                            }
                        }
                        None => {
                            info!(
                                "Connection {} has no GUID, skipping the GUID filter check",
                                connection.token()
                            );
                            reporter.record_step(StepResult::passed(
                                format!("Connection GUID check skipped for {}", connection.token()),
                                0,
                            ));
                        }
                    }
                }
                None => debug!("No specific connection planned, skipping the GUID filter check"),
            }
        }

        if config.check_reset && can_reset {
            let (step, row) = guarded(
                "Reset filters to default",
                limit,
                check_reset_to_default(&mut screen, grand_total, &counts_url),
            )
            .await;
            reporter.record_step(step);
            if let Some(row) = row {
                reporter.append_row(row);
            }
        }

        let report = reporter.finish();
        report.log();
        Ok(report)
    }
}

/// First parent account with a planned specific connection
fn first_specific_connection<'p>(
    entries: impl Iterator<Item = (&'p Account, &'p [ConnectionSelector])>,
) -> Option<(&'p Account, &'p Connection)> {
    entries
        .filter(|(account, _)| !account.is_aggregate())
        .find_map(|(account, selectors)| {
            selectors.iter().find_map(|selector| match selector {
                ConnectionSelector::Specific(connection) => Some((account, connection)),
                ConnectionSelector::AllConnections => None,
            })
        })
}
