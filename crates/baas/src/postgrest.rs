//! Renders core query values into the row store's URL dialect.

use trauma_core::constants::PATIENT_SEARCH_COLUMNS;
use trauma_core::query::{AdmissionQuery, OrderBy, PatientQuery, RowRange};
use trauma_core::AdmissionStatus;

pub(crate) type Params = Vec<(String, String)>;

/// Projection of an admission with its patient embedded.
pub(crate) const ADMISSION_WITH_PATIENT: &str = "*,patients(*)";

/// Double-quotes a filter value so commas, dots and parentheses are taken literally.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

pub(crate) fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

pub(crate) fn in_list(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("in.({})", quoted.join(","))
}

/// Escapes LIKE wildcards so `%` and `_` typed by the operator match literally.
///
/// `*` has no escape in this dialect and still matches anything.
fn like_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `(first_name.ilike."*text*",last_name.ilike."*text*",...)`
pub(crate) fn search_filter(text: &str) -> String {
    let pattern = quote(&format!("*{}*", like_literal(text.trim())));
    let parts: Vec<String> = PATIENT_SEARCH_COLUMNS
        .iter()
        .map(|column| format!("{column}.ilike.{pattern}"))
        .collect();
    format!("({})", parts.join(","))
}

/// Matches every stored spelling that reads back as `status`, ignoring case.
///
/// Missing and blank statuses read as ADMITTED, so the ADMITTED filter takes them too.
pub(crate) fn status_filter(status: AdmissionStatus) -> String {
    let mut parts: Vec<String> = Vec::new();
    if status == AdmissionStatus::default() {
        parts.push("status.is.null".into());
        parts.push(format!("status.eq.{}", quote("")));
    }
    parts.extend(
        status
            .spellings()
            .iter()
            .map(|spelling| format!("status.ilike.{}", quote(spelling))),
    );
    format!("({})", parts.join(","))
}

pub(crate) fn order(order: OrderBy) -> String {
    let direction = if order.descending { "desc" } else { "asc" };
    format!("{}.{direction}", order.column)
}

fn push_range(params: &mut Params, range: Option<RowRange>) {
    if let Some(range) = range {
        params.push(("offset".into(), range.from.to_string()));
        params.push(("limit".into(), range.limit().to_string()));
    }
}

pub(crate) fn patient_params(query: &PatientQuery) -> Params {
    let mut params: Params = vec![("select".into(), "*".into())];
    if let Some(text) = &query.search {
        params.push(("or".into(), search_filter(text)));
    }
    params.push(("order".into(), order(query.order)));
    push_range(&mut params, query.range);
    params
}

pub(crate) fn admission_params(query: &AdmissionQuery) -> Params {
    let select = if query.expand_patient {
        ADMISSION_WITH_PATIENT
    } else {
        "*"
    };
    let mut params: Params = vec![("select".into(), select.into())];

    if let Some(ids) = &query.patient_ids {
        params.push(("patient_id".into(), in_list(ids)));
    }
    if let Some(date) = query.date_of_injury {
        params.push(("date_of_injury".into(), eq(date.format("%Y-%m-%d"))));
    }
    if let Some(status) = query.status {
        params.push(("or".into(), status_filter(status)));
    }
    params.push(("order".into(), order(query.order)));
    push_range(&mut params, query.range);
    params
}

/// The `offset` a request asked for, or 0 when it is unpaginated.
pub(crate) fn offset(params: &Params) -> u64 {
    params
        .iter()
        .find(|(key, _)| key == "offset")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(0)
}

/// Total row count from a `Content-Range` header such as `0-9/15` or `*/0`.
pub(crate) fn total_from_content_range(header: Option<&str>) -> Option<u64> {
    let (_, total) = header?.trim().rsplit_once('/')?;
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use trauma_core::query::{AdmissionFilter, AdmissionQueryPlan, PageRequest};

    fn get<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn search_filter_ors_the_three_columns() {
        assert_eq!(
            search_filter(" ana "),
            r#"(first_name.ilike."*ana*",last_name.ilike."*ana*",hospital_registration_number.ilike."*ana*")"#
        );
    }

    #[test]
    fn search_filter_matches_like_wildcards_literally() {
        assert_eq!(
            search_filter("50%_a"),
            r#"(first_name.ilike."*50\\%\\_a*",last_name.ilike."*50\\%\\_a*",hospital_registration_number.ilike."*50\\%\\_a*")"#
        );
    }

    #[test]
    fn admitted_filter_takes_missing_and_blank_statuses() {
        assert_eq!(
            status_filter(AdmissionStatus::Admitted),
            r#"(status.is.null,status.eq."",status.ilike."ADMITTED")"#
        );
    }

    #[test]
    fn offset_comes_from_the_page_range() {
        let params = admission_params(&AdmissionQuery::for_patient("p-1"));
        assert_eq!(offset(&params), 0);
        let params = patient_params(&PatientQuery::page(None, PageRequest::patients(3)));
        assert_eq!(offset(&params), 30);
    }

    #[test]
    fn quoted_values_escape_quotes_and_commas_survive() {
        assert_eq!(in_list(&["a,b".into(), "c\"d".into()]), r#"in.("a,b","c\"d")"#);
    }

    #[test]
    fn admission_query_renders_filters_order_and_range() {
        let filter = AdmissionFilter {
            free_text: Some("ana".into()),
            date_of_injury: NaiveDate::from_ymd_opt(2024, 7, 12),
            status: Some(AdmissionStatus::Discharged),
        };
        let AdmissionQueryPlan::Query(query) =
            filter.compose(PageRequest::admissions(2), Some(vec!["p-1".into(), "p-2".into()]))
        else {
            panic!("expected a query");
        };
        let params = admission_params(&query);

        assert_eq!(get(&params, "select"), Some("*,patients(*)"));
        assert_eq!(get(&params, "patient_id"), Some(r#"in.("p-1","p-2")"#));
        assert_eq!(get(&params, "date_of_injury"), Some("eq.2024-07-12"));
        assert_eq!(
            get(&params, "or"),
            Some(r#"(status.ilike."DISCHARGED",status.ilike."DISCHARGE")"#)
        );
        assert_eq!(get(&params, "status"), None);
        assert_eq!(get(&params, "order"), Some("created_at.desc"));
        assert_eq!(get(&params, "offset"), Some("10"));
        assert_eq!(get(&params, "limit"), Some("10"));
    }

    #[test]
    fn patient_history_query_is_unpaginated() {
        let params = admission_params(&AdmissionQuery::for_patient("p-1"));
        assert_eq!(get(&params, "select"), Some("*"));
        assert_eq!(get(&params, "offset"), None);
        assert_eq!(get(&params, "limit"), None);
    }

    #[test]
    fn patient_query_with_search() {
        let params = patient_params(&PatientQuery::page(Some("cruz"), PageRequest::patients(1)));
        assert!(get(&params, "or").is_some_and(|v| v.contains("last_name.ilike.\"*cruz*\"")));
        assert_eq!(get(&params, "limit"), Some("15"));
    }

    #[test]
    fn content_range_total() {
        assert_eq!(total_from_content_range(Some("0-9/15")), Some(15));
        assert_eq!(total_from_content_range(Some("*/0")), Some(0));
        assert_eq!(total_from_content_range(Some("0-9/*")), None);
        assert_eq!(total_from_content_range(None), None);
    }
}
