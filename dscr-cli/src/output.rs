use std::fmt::Write;

use clap::ValueEnum;
use dscr_core::calculations::common::{format_amount, format_currency_output};
use dscr_core::{DscrResult, Session};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    property_value_label: &'a str,
    property_value: Decimal,
    loan_amount: Decimal,
    #[serde(flatten)]
    result: &'a DscrResult,
    severity: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    shareable_link: Option<&'a str>,
}

/// Renders `result` for `session` in the requested format.
pub fn render(
    format: OutputFormat,
    session: &Session,
    result: &DscrResult,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(session, result)),
        OutputFormat::Json => render_json(session, result),
    }
}

pub fn render_text(
    session: &Session,
    result: &DscrResult,
) -> String {
    let loan = &session.state().loan;
    let rows = [
        (
            session.property_value_label(),
            format_currency_output(loan.property_value.value()),
        ),
        ("Loan Amount", format_currency_output(loan.loan_amount.value())),
        (
            "Mortgage Payment",
            format_currency_output(result.monthly_mortgage_payment),
        ),
        ("Taxes", format_currency_output(result.monthly_taxes)),
        ("Insurance", format_currency_output(result.monthly_insurance)),
        ("HOA Fees", format_currency_output(result.hoa_fees_monthly)),
        (
            "Total Expenses",
            format_currency_output(result.total_monthly_expenses),
        ),
        ("Rental Income", format_currency_output(result.rental_income)),
        ("DSCR", format_amount(result.dscr_value, 2)),
        ("Severity", result.message_severity.as_str().to_string()),
    ];

    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (label, value) in rows {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{label:<width$}  {value}");
    }
    let _ = writeln!(out, "\n{}", result.message);
    if let Some(link) = session.shareable_link() {
        let _ = writeln!(out, "\n{link}");
    }
    out
}

pub fn render_json(
    session: &Session,
    result: &DscrResult,
) -> serde_json::Result<String> {
    let loan = &session.state().loan;
    let report = JsonReport {
        property_value_label: session.property_value_label(),
        property_value: loan.property_value.value(),
        loan_amount: loan.loan_amount.value(),
        result,
        severity: result.message_severity.as_str(),
        shareable_link: session.shareable_link(),
    };
    serde_json::to_string_pretty(&report)
}

#[cfg(test)]
mod tests {
    use dscr_core::fallback_message_rules;
    use pretty_assertions::assert_eq;

    use super::*;

    fn calculated() -> (Session, DscrResult) {
        let mut session = Session::new(fallback_message_rules());
        let result = session.calculate().clone();
        (session, result)
    }

    #[test]
    fn test_text_report_rows() {
        let (session, result) = calculated();

        let text = render_text(&session, &result);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Purchase Price    $600,000.00");
        assert_eq!(lines[1], "Loan Amount       $450,000.00");
        assert!(lines.iter().any(|l| l.starts_with("DSCR") && l.ends_with("0.99")));
        assert!(lines.iter().any(|l| l.ends_with("warning")));
        assert!(text.contains("Your rent does not cover your payment"));
    }

    #[test]
    fn test_text_report_message_follows_blank_line() {
        let (session, result) = calculated();

        let text = render_text(&session, &result);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 12);
        assert_eq!(lines[9], "Severity          warning");
        assert_eq!(lines[10], "");
        assert_eq!(lines[11], result.message);
    }

    #[test]
    fn test_text_report_includes_link() {
        let (mut session, result) = calculated();
        session.share_at("https://example.com/calc", 1);

        let text = render_text(&session, &result);

        assert!(text.trim_end().ends_with("&v=1"), "unexpected tail: {text}");
    }

    #[test]
    fn test_json_report_fields() {
        let (session, result) = calculated();

        let json = render(OutputFormat::Json, &session, &result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["property_value_label"], "Purchase Price");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["message_severity"], "Warning");
        assert!(value.get("shareable_link").is_none());
        assert!(value.get("monthly_mortgage_payment").is_some());
    }
}
