//! Pagination & sort verifier
//!
//! Runs every sort option × page size combination on the current filter and
//! checks the first, third and last page of each for row count and ordering.

use aerialink_common::pagination::{expected_rows_on_page, pages_to_validate};
use aerialink_common::{PageCheck, PaginationSummary, SortCheck, SortOption};
use tracing::{info, warn};

use crate::page::Page;
use crate::screen::{ConnectionsScreen, RowCount};
use crate::step::{guarded, StepResult};

/// Sample cells kept per page for the report
const SAMPLE_SIZE: usize = 3;

pub struct SortPagingVerifier<'s, 'a, P: Page + ?Sized> {
    screen: &'s mut ConnectionsScreen<'a, P>,
    steps: Vec<StepResult>,
}

impl<'s, 'a, P: Page + ?Sized> SortPagingVerifier<'s, 'a, P> {
    pub fn new(screen: &'s mut ConnectionsScreen<'a, P>) -> Self {
        Self {
            screen,
            steps: Vec::new(),
        }
    }

    pub fn take_steps(&mut self) -> Vec<StepResult> {
        std::mem::take(&mut self.steps)
    }

    pub async fn verify_sort_and_paging(
        &mut self,
        sort_options: &[SortOption],
        page_sizes: &[u64],
    ) -> Vec<PageCheck> {
        info!(
            "Sort/paging matrix: {} sort option(s) x {} page size(s)",
            sort_options.len(),
            page_sizes.len()
        );

        let mut checks = Vec::new();
        for sort in sort_options {
            let label = sort.label();
            let limit = self.screen.timeouts().guard();
            let (step, applied) =
                guarded(format!("Sort by {}", label), limit, self.screen.apply_sort(&label)).await;
            let error = step.error.clone();
            self.steps.push(step);

            if applied.is_none() {
                let error = error.unwrap_or_default();
                checks.extend(
                    page_sizes
                        .iter()
                        .map(|size| PageCheck::unreached(sort, *size, error.clone())),
                );
                continue;
            }

            for size in page_sizes {
                checks.extend(self.verify_page_size(sort, *size).await);
            }
        }
        checks
    }

    async fn verify_page_size(&mut self, sort: &SortOption, size: u64) -> Vec<PageCheck> {
        let label = sort.label();
        let limit = self.screen.timeouts().guard();

        let screen = &mut *self.screen;
        let (step, summary) = guarded(format!("Show {} entries ({})", size, label), limit, async {
            screen.apply_page_size(size).await?;
            let summary = screen.read_summary().await?;
            let total_pages = summary.total_pages(size)?;
            Ok((summary, total_pages))
        })
        .await;
        let error = step.error.clone();
        self.steps.push(step);

        let Some((summary, total_pages)) = summary else {
            return vec![PageCheck::unreached(sort, size, error.unwrap_or_default())];
        };

        let pages = pages_to_validate(total_pages);
        info!(
            "Show {} entries | {} | {} records, {} page(s), validating {:?}",
            size, label, summary.total, total_pages, pages
        );

        let mut checks = Vec::with_capacity(pages.len());
        for page in pages {
            let check = self.verify_page(sort, size, summary, total_pages, page).await;
            if check.passed() {
                info!("✓ Show {} entries, page {} ({})", size, page, label);
            } else {
                warn!(
                    "✗ Show {} entries, page {} ({}) - {}",
                    size,
                    page,
                    label,
                    check.failure_reason().unwrap_or_default()
                );
            }
            checks.push(check);
        }
        checks
    }

    async fn verify_page(
        &mut self,
        sort: &SortOption,
        size: u64,
        summary: PaginationSummary,
        total_pages: u64,
        page: u64,
    ) -> PageCheck {
        let limit = self.screen.timeouts().guard();
        let field = sort.field;

        let screen = &mut *self.screen;
        let (step, observed) = guarded(
            format!("Show {} entries, page {} ({})", size, page, sort.label()),
            limit,
            async {
                screen.go_to_page(page, total_pages).await?;
                let rows = screen.count_rows().await?;
                let values = if rows.rows > 0 {
                    screen.column_values(field).await?
                } else {
                    Vec::new()
                };
                Ok((rows, values))
            },
        )
        .await;
        let error = step.error.clone();
        self.steps.push(step);

        page_check(
            sort,
            size,
            summary.total,
            total_pages,
            page,
            observed.ok_or_else(|| error.unwrap_or_default()),
        )
    }
}

/// Build the check for one page from its observed rows and sort column
pub fn page_check(
    sort: &SortOption,
    page_size: u64,
    total: u64,
    total_pages: u64,
    page: u64,
    observed: Result<(RowCount, Vec<String>), String>,
) -> PageCheck {
    let expected_rows = expected_rows_on_page(total, page_size, page);
    let mut check = PageCheck {
        sort_option: sort.label(),
        page_size,
        page_number: Some(page),
        total_pages: Some(total_pages),
        expected_rows,
        actual_rows: 0,
        sort_ascending: sort.is_ascending(),
        sample_values: Vec::new(),
        sort_in_order: false,
        no_matching_records: false,
        error: None,
    };

    match observed {
        Ok((rows, values)) => {
            check.actual_rows = rows.rows;
            check.no_matching_records = rows.no_matching_records;
            check.sort_in_order =
                SortCheck::evaluate(sort.field, sort.is_ascending(), &values).in_order;
            check.sample_values = values.into_iter().take(SAMPLE_SIZE).collect();
        }
        Err(error) => check.error = Some(error),
    }
    check
}
