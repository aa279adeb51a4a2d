//! Search, filter and pagination for list views.
//!
//! The composer turns filter state into a backend-neutral query value. Backends render it
//! into their own dialect; nothing here performs I/O.

use crate::admission::AdmissionStatus;
use crate::constants::{ADMISSIONS_PAGE_SIZE, CREATED_AT_COLUMN, PATIENTS_PAGE_SIZE};
use crate::patient::Patient;
use chrono::NaiveDate;
use serde::Serialize;

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Pages below 1 are clamped to 1; a zero page size is treated as 1.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn admissions(page: u32) -> Self {
        Self::new(page, ADMISSIONS_PAGE_SIZE)
    }

    pub fn patients(page: u32) -> Self {
        Self::new(page, PATIENTS_PAGE_SIZE)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Inclusive row range for this page.
    pub fn range(&self) -> RowRange {
        let from = (self.page as u64 - 1) * self.page_size as u64;
        RowRange {
            from,
            to: from + self.page_size as u64 - 1,
        }
    }
}

/// Inclusive, zero-based row range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub from: u64,
    pub to: u64,
}

impl RowRange {
    pub fn limit(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// Rows from a store query together with the exact count of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Counted<T> {
    pub rows: Vec<T>,
    pub total_count: u64,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn from_counted(counted: Counted<T>, request: PageRequest) -> Self {
        Self {
            rows: counted.rows,
            total_count: counted.total_count,
            page: request.page(),
            page_size: request.page_size(),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self {
            rows: Vec::new(),
            total_count: 0,
            page: request.page(),
            page_size: request.page_size(),
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(self.page_size.max(1) as u64)
    }
}

/// Sort order. Every list orders by `created_at` descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub descending: bool,
}

impl OrderBy {
    pub const CREATED_AT_DESC: OrderBy = OrderBy {
        column: CREATED_AT_COLUMN,
        descending: true,
    };
}

/// Filter state of the admissions list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionFilter {
    pub free_text: Option<String>,
    pub date_of_injury: Option<NaiveDate>,
    /// `None` means all statuses.
    pub status: Option<AdmissionStatus>,
}

impl AdmissionFilter {
    /// The trimmed search text, if any.
    pub fn search_text(&self) -> Option<&str> {
        self.free_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Builds the admission query.
    ///
    /// `matched_patient_ids` is the result of resolving the search text against patients.
    /// With search text present and no matching patient the plan is empty, not unfiltered.
    pub fn compose(
        &self,
        page: PageRequest,
        matched_patient_ids: Option<Vec<String>>,
    ) -> AdmissionQueryPlan {
        let patient_ids = match (self.search_text(), matched_patient_ids) {
            (None, _) => None,
            (Some(_), Some(ids)) if !ids.is_empty() => Some(ids),
            (Some(_), _) => return AdmissionQueryPlan::Empty(page),
        };

        AdmissionQueryPlan::Query(AdmissionQuery {
            patient_ids,
            date_of_injury: self.date_of_injury,
            status: self.status,
            order: OrderBy::CREATED_AT_DESC,
            range: Some(page.range()),
            expand_patient: true,
        })
    }
}

/// What to run for an admissions list request.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionQueryPlan {
    /// Nothing can match; answer with an empty page without querying.
    Empty(PageRequest),
    Query(AdmissionQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionQuery {
    pub patient_ids: Option<Vec<String>>,
    pub date_of_injury: Option<NaiveDate>,
    pub status: Option<AdmissionStatus>,
    pub order: OrderBy,
    /// `None` returns every matching row.
    pub range: Option<RowRange>,
    pub expand_patient: bool,
}

impl AdmissionQuery {
    /// All admissions of one patient, newest first, unpaginated.
    pub fn for_patient(patient_id: &str) -> Self {
        Self {
            patient_ids: Some(vec![patient_id.to_string()]),
            date_of_injury: None,
            status: None,
            order: OrderBy::CREATED_AT_DESC,
            range: None,
            expand_patient: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientQuery {
    pub search: Option<String>,
    pub order: OrderBy,
    pub range: Option<RowRange>,
}

impl PatientQuery {
    pub fn page(search: Option<&str>, page: PageRequest) -> Self {
        Self {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            order: OrderBy::CREATED_AT_DESC,
            range: Some(page.range()),
        }
    }
}

/// Case-insensitive partial match on first name, last name or registration number.
pub fn matches_patient_search(patient: &Patient, text: &str) -> bool {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [
        Some(patient.first_name.as_str()),
        Some(patient.last_name.as_str()),
        patient.hospital_registration_number.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|value| value.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_range_and_clamping() {
        assert_eq!(PageRequest::admissions(1).range(), RowRange { from: 0, to: 9 });
        assert_eq!(PageRequest::admissions(2).range(), RowRange { from: 10, to: 19 });
        assert_eq!(PageRequest::patients(3).range(), RowRange { from: 30, to: 44 });
        assert_eq!(PageRequest::admissions(0).page(), 1);
        assert_eq!(PageRequest::admissions(0).range().limit(), 10);
    }

    #[test]
    fn total_pages_is_ceiling_of_count() {
        let mut page: Page<()> = Page::empty(PageRequest::admissions(1));
        assert_eq!(page.total_pages(), 0);
        page.total_count = 15;
        assert_eq!(page.total_pages(), 2);
        page.total_count = 20;
        assert_eq!(page.total_pages(), 2);
        page.total_count = 21;
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn search_without_matches_is_empty_plan() {
        let filter = AdmissionFilter {
            free_text: Some("  zed ".into()),
            ..Default::default()
        };
        let page = PageRequest::admissions(1);

        assert_eq!(filter.compose(page, Some(vec![])), AdmissionQueryPlan::Empty(page));
        assert_eq!(filter.compose(page, None), AdmissionQueryPlan::Empty(page));
    }

    #[test]
    fn compose_restricts_to_matched_patients_and_filters() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 12);
        let filter = AdmissionFilter {
            free_text: Some("ana".into()),
            date_of_injury: date,
            status: Some(AdmissionStatus::Discharged),
        };

        let AdmissionQueryPlan::Query(query) =
            filter.compose(PageRequest::admissions(2), Some(vec!["p-1".into()]))
        else {
            panic!("expected a query");
        };
        assert_eq!(query.patient_ids, Some(vec!["p-1".to_string()]));
        assert_eq!(query.date_of_injury, date);
        assert_eq!(query.status, Some(AdmissionStatus::Discharged));
        assert_eq!(query.order, OrderBy::CREATED_AT_DESC);
        assert_eq!(query.range, Some(RowRange { from: 10, to: 19 }));
    }

    #[test]
    fn blank_search_text_is_ignored() {
        let filter = AdmissionFilter {
            free_text: Some("   ".into()),
            ..Default::default()
        };
        let AdmissionQueryPlan::Query(query) = filter.compose(PageRequest::admissions(1), None)
        else {
            panic!("expected a query");
        };
        assert_eq!(query.patient_ids, None);
        assert_eq!(query.status, None);
    }
}
